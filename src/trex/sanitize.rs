//! Strip banner and prompt noise from `trex-console` output.

/// Text `trex-console -q` prints around every answer, in removal order.
///
/// The composite prompt+header artifact must go before the bare prompt, or
/// removing the prompt would leave a stray header behind. The misspellings
/// are the console's own.
pub const CONSOLE_NOISE: &[&str] = &[
    "Using 'python3' as Python interpeter",
    "-=TRex Console v3.0=-",
    "Type 'help' or '?' for supported actions",
    "trex>Global Statistitcs",
    "trex>",
];

/// Remove every occurrence of [`CONSOLE_NOISE`], leaving other text as is.
///
/// Removal is repeated until nothing changes, so noise that only appears once
/// a surrounding piece is cut out is removed too and the result is stable
/// under a second pass.
pub fn sanitize_console_output(raw: &str) -> String {
    let mut current = raw.to_string();
    loop {
        let next = CONSOLE_NOISE
            .iter()
            .fold(current.clone(), |text, noise| text.replace(noise, ""));
        if next == current {
            return next;
        }
        current = next;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strips_prompt_and_statistics_header() {
        let raw = "trex>Global Statistitcs\nConsole Commands\ntrex>";
        assert_eq!(sanitize_console_output(raw), "\nConsole Commands\n");
    }

    #[test]
    fn test_strips_startup_banners() {
        let raw = "Using 'python3' as Python interpeter\n\
                   -=TRex Console v3.0=-\n\
                   Type 'help' or '?' for supported actions\n\
                   trex>port 0 | 1";
        assert_eq!(sanitize_console_output(raw), "\n\n\nport 0 | 1");
    }

    #[test]
    fn test_leaves_unrelated_text_alone() {
        assert_eq!(
            sanitize_console_output("command not found"),
            "command not found"
        );
        assert_eq!(sanitize_console_output(""), "");
    }

    #[test]
    fn test_nested_noise_is_removed() {
        assert_eq!(sanitize_console_output("trtrex>ex>done"), "done");
    }
}
