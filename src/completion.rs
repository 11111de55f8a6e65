//! # Shell Completion Module
//!
//! Generation of completion scripts for the supported shells through
//! `clap_complete`.
//!
//! ```bash
//! # Generate bash completions
//! moodtify completion bash > ~/.local/share/bash-completion/completions/moodtify
//!
//! # Generate zsh completions
//! moodtify completion zsh > ~/.config/zsh/completions/_moodtify
//! ```

use crate::cli;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Write completions for `cmd` to standard output.
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    generate_completions_to(gen, cmd, &mut io::stdout());
}

/// Write completions for `cmd` to `out`.
pub fn generate_completions_to<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Map our CLI shell enum onto `clap_complete`'s.
#[must_use]
pub const fn shell_to_completion_shell(shell: &cli::Shell) -> CompletionShell {
    match shell {
        cli::Shell::Bash => CompletionShell::Bash,
        cli::Shell::Zsh => CompletionShell::Zsh,
        cli::Shell::Fish => CompletionShell::Fish,
        cli::Shell::PowerShell => CompletionShell::PowerShell,
        cli::Shell::Elvish => CompletionShell::Elvish,
    }
}
