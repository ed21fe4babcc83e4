//! Config command - show the effective configuration

use anyhow::{Context, Result};
use stepwise_config::Config;

/// Print `config` as TOML, noting where the project file was found
pub fn run(config: &Config) -> Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

fn render(config: &Config) -> Result<String> {
    let body = config
        .to_toml()
        .context("Failed to render configuration")?;
    let header = match config.project_root() {
        Some(root) => format!("# project: {}\n", root.display()),
        None => "# no project stepwise.toml found\n".to_string(),
    };
    Ok(format!("{}{}", header, body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_defaults() {
        let text = render(&Config::default()).unwrap();
        assert!(text.starts_with("# no project stepwise.toml found"));
        assert!(text.contains("[sandbox]"));
        assert!(text.contains("step_budget = 1000000"));
        assert!(text.contains("[snapshot]"));
    }
}
