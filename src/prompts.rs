pub const ENHANCE_SYSTEM: &str = include_str!("../data/prompts/enhance_system.txt");
pub const ENHANCE_USER: &str = include_str!("../data/prompts/enhance_user.txt");

/// Replace `{{key}}` placeholders in a template string.
pub fn render(template: &str, vars: &[(&str, &str)]) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        result = result.replace(&format!("{{{{{}}}}}", key), value);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_single_var() {
        assert_eq!(
            render("Hello {{name}}!", &[("name", "world")]),
            "Hello world!"
        );
    }

    #[test]
    fn test_prompts_are_non_empty() {
        assert!(!ENHANCE_SYSTEM.is_empty());
        assert!(!ENHANCE_USER.is_empty());
    }

    #[test]
    fn test_enhance_user_has_request_placeholder() {
        assert!(ENHANCE_USER.contains("{{request}}"));
    }

    #[test]
    fn test_enhance_system_describes_the_schema() {
        assert!(ENHANCE_SYSTEM.contains("characterCount"));
        assert!(ENHANCE_SYSTEM.contains("characterPrompts"));
        assert!(ENHANCE_SYSTEM.contains("position"));
    }
}
