//! Shell completion generation.

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{Shell, generate};

use crate::Cli;

/// Generate shell completions to stdout.
pub(crate) fn cmd_completions(shell: Shell) {
    render_completions(shell, &mut io::stdout());
}

fn render_completions(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(shell: Shell) -> String {
        let mut buf = Vec::new();
        render_completions(shell, &mut buf);
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_bash_completions_name_every_command() {
        let output = render(Shell::Bash);
        for command in ["list-ports", "monitor", "send", "completions"] {
            assert!(output.contains(command), "missing {command}");
        }
    }

    #[test]
    fn test_zsh_completions_mention_binary() {
        assert!(render(Shell::Zsh).contains("robust-serial"));
    }

    #[test]
    fn test_fish_completions_include_global_flags() {
        let output = render(Shell::Fish);
        assert!(output.contains("read-timeout-ms"));
        assert!(output.contains("blocking"));
    }

    #[test]
    fn test_other_shells_generate_output() {
        assert!(!render(Shell::PowerShell).is_empty());
        assert!(!render(Shell::Elvish).is_empty());
    }
}
