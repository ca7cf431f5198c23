use std::str::FromStr;

/// Value of `--name=value` or `--name value`; first match wins.
pub fn string_arg(args: &[String], name: &str) -> Option<String> {
    for (idx, arg) in args.iter().enumerate() {
        if let Some(v) = arg.strip_prefix(&format!("{name}="))
            && !v.trim().is_empty()
        {
            return Some(v.trim().to_string());
        }
        if arg == name
            && let Some(next) = args.get(idx + 1)
            && !next.trim().is_empty()
            && !next.starts_with("--")
        {
            return Some(next.trim().to_string());
        }
    }
    None
}

pub fn parse_arg<T: FromStr>(args: &[String], name: &str) -> Option<T> {
    string_arg(args, name).and_then(|v| v.parse::<T>().ok())
}

pub fn has_flag(args: &[String], name: &str) -> bool {
    args.iter().any(|a| a == name)
}
