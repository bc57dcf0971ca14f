/// Renders a secret for logs: the first four characters and the length.
pub fn mask_secret(s: &str) -> String {
    if s.is_empty() {
        return "<empty>".into();
    }
    let prefix = s.chars().take(4).collect::<String>();
    format!("{}*** (len={})", prefix, s.chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_all_but_prefix() {
        assert_eq!(mask_secret("eyJhbGciOi"), "eyJh*** (len=10)");
        assert_eq!(mask_secret(""), "<empty>");
        assert_eq!(mask_secret("ab"), "ab*** (len=2)");
    }
}
