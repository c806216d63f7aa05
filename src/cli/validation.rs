use crate::cli::args::CliArgs;

pub fn validate(args: &CliArgs) -> Result<(), String> {
    if let Some(url) = args.url.as_deref() {
        if reqwest::Url::parse(url.trim()).is_err() {
            return Err(format!("invalid --url '{url}'"));
        }
    }
    if args.categories.iter().any(|c| c.trim().is_empty()) {
        return Err("empty --cat name".to_string());
    }
    if args.toggle.iter().any(|t| t.trim().is_empty()) {
        return Err("empty --toggle name".to_string());
    }
    if let Some(timeout) = args.timeout {
        if timeout == 0 {
            return Err("invalid --timeout, expected positive integer".to_string());
        }
    }
    if let Some(raw) = args.output_format.as_deref() {
        if crate::output::OutputFormat::parse(raw).is_none() {
            return Err(format!("invalid --of '{raw}', expected text or json"));
        }
    }
    Ok(())
}
