use std::io::{BufRead, Write};

use crate::{
    error::ReleaseError,
    version::{increment_version, is_strict_semver, Bump},
};

/// What to answer a confirmation with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Answer {
    /// Ask on the terminal.
    #[default]
    Ask,
    Yes,
    No,
}

impl Answer {
    pub fn from_flags(yes: bool, no: bool) -> Self {
        match (yes, no) {
            (_, true) => Answer::No,
            (true, false) => Answer::Yes,
            (false, false) => Answer::Ask,
        }
    }
}

/// Line-oriented operator interaction. End of input counts as an interrupt.
pub struct Console<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Console<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    pub fn into_output(self) -> W {
        self.output
    }

    pub fn say(&mut self, text: impl AsRef<str>) -> anyhow::Result<()> {
        writeln!(self.output, "{}", text.as_ref())?;
        Ok(())
    }

    pub fn ask(&mut self, question: &str) -> anyhow::Result<String> {
        write!(self.output, "{question}")?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Err(ReleaseError::Interrupted.into());
        }
        Ok(line.trim().to_string())
    }

    pub fn confirm(
        &mut self,
        question: &str,
        default_yes: bool,
        answer: Answer,
    ) -> anyhow::Result<bool> {
        let suffix = if default_yes { "[Y/n]" } else { "[y/N]" };
        match answer {
            Answer::Yes => {
                self.say(format!("{question} {suffix}: y (from flags)"))?;
                return Ok(true);
            }
            Answer::No => {
                self.say(format!("{question} {suffix}: n (from flags)"))?;
                return Ok(false);
            }
            Answer::Ask => {}
        }

        loop {
            let reply = self.ask(&format!("{question} {suffix}: "))?.to_lowercase();
            match reply.as_str() {
                "" => return Ok(default_yes),
                "y" | "yes" => return Ok(true),
                "n" | "no" => return Ok(false),
                _ => self.say("Please answer with 'y' or 'n'.")?,
            }
        }
    }

    /// Menu of bumps, a custom value, or keeping `base`. Re-asks until the
    /// reply is usable.
    pub fn select_target_version(&mut self, base: &str) -> anyhow::Result<String> {
        let patch = increment_version(base, Bump::Patch)?;
        let minor = increment_version(base, Bump::Minor)?;
        let major = increment_version(base, Bump::Major)?;

        self.say("\nChoose release version:")?;
        self.say(format!("  1) Patch  -> {patch}"))?;
        self.say(format!("  2) Minor  -> {minor}"))?;
        self.say(format!("  3) Major  -> {major}"))?;
        self.say("  4) Custom")?;
        self.say(format!("  5) Keep current ({base})"))?;

        loop {
            match self.ask("Selection [1-5]: ")?.as_str() {
                "1" => return Ok(patch),
                "2" => return Ok(minor),
                "3" => return Ok(major),
                "4" => {
                    let custom = self.ask("Enter custom semantic version (X.Y.Z): ")?;
                    if is_strict_semver(&custom) {
                        return Ok(custom);
                    }
                    self.say("Invalid semantic version format.")?;
                }
                "5" => return Ok(base.to_string()),
                _ => self.say("Please choose a number between 1 and 5.")?,
            }
        }
    }
}
