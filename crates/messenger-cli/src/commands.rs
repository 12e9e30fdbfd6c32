use clap::{Args, Parser, Subcommand};

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Command(Command),

    /// Anything that does not start with `/` is a message
    Say(String),
}

impl Input {
    /// Route a line: `/name args..` goes through the command grammar, the
    /// rest is text for the open conversation.
    pub fn parse(line: &str) -> Result<Self, clap::Error> {
        let Some(rest) = line.trim_start().strip_prefix('/') else {
            return Ok(Self::Say(line.to_string()));
        };
        let repl = Repl::try_parse_from(rest.split_whitespace())?;
        Ok(Self::Command(repl.command))
    }
}

/// Slash commands; the command name takes the place of the binary name.
#[derive(Parser, Debug)]
#[command(
    multicall = true,
    subcommand_value_name = "COMMAND",
    subcommand_help_heading = "Commands",
    after_help = "Lines without a leading / are sent to the open conversation."
)]
struct Repl {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Create an account and sign in
    Register {
        username: String,
        email: String,
        password: String,
        confirm: String,
    },

    /// Sign in with email and password
    Login { email: String, password: String },

    /// Sign in through the identity provider
    Provider {
        email: String,

        /// Name the provider reports; defaults to none
        display_name: Vec<String>,
    },

    /// Resume a session from a token printed at sign-in
    Restore { token: String },

    /// Sign out and mark yourself offline
    Logout,

    /// List contacts whose name contains the query
    Users { query: Vec<String> },

    /// Open the conversation with a contact
    Open {
        /// Username, email, or part of a name
        #[arg(required = true)]
        name: Vec<String>,
    },

    /// Load the previous page of the open conversation
    Older,

    /// Show your profile, or change the given fields
    Profile(ProfileEdit),

    /// List the emoji palette, or add one to the draft
    Emoji { index: Option<usize> },

    /// Leave the input; clears your typing indicator
    Blur,

    /// Sign out and exit
    #[command(alias = "exit")]
    Quit,
}

/// Fields given to `/profile`; none means "show".
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    #[arg(long)]
    pub username: Option<String>,

    /// May span several words
    #[arg(long, num_args = 1..)]
    pub bio: Option<Vec<String>>,

    #[arg(long)]
    pub photo: Option<String>,
}

impl ProfileEdit {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.bio.is_none() && self.photo.is_none()
    }

    pub fn bio(&self) -> Option<String> {
        self.bio.as_ref().map(|words| words.join(" "))
    }
}

/// Words of a trailing argument as one string, `None` when there are none.
pub fn joined(words: &[String]) -> Option<String> {
    (!words.is_empty()).then(|| words.join(" "))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use clap::error::ErrorKind;

    fn command(line: &str) -> Command {
        match Input::parse(line) {
            Ok(Input::Command(command)) => command,
            other => panic!("{line:?} parsed as {other:?}"),
        }
    }

    fn error_kind(line: &str) -> ErrorKind {
        match Input::parse(line) {
            Err(e) => e.kind(),
            Ok(input) => panic!("{line:?} parsed as {input:?}"),
        }
    }

    #[test]
    fn grammar_is_consistent() {
        Repl::command().debug_assert();
    }

    #[test]
    fn plain_text_is_a_message() {
        assert_eq!(Input::parse("hello /there").unwrap(), Input::Say("hello /there".into()));
        assert_eq!(Input::parse("").unwrap(), Input::Say(String::new()));
    }

    #[test]
    fn account_commands() {
        assert_eq!(
            command("/login a@b.co secret1"),
            Command::Login {
                email: "a@b.co".into(),
                password: "secret1".into()
            }
        );
        assert_eq!(error_kind("/login a@b.co"), ErrorKind::MissingRequiredArgument);
        assert!(matches!(
            command("/register alice a@b.co pw1234 pw1234"),
            Command::Register { .. }
        ));

        let Command::Provider { email, display_name } = command("/provider c@d.co Carol Smith") else {
            panic!("expected a provider command");
        };
        assert_eq!(email, "c@d.co");
        assert_eq!(joined(&display_name).as_deref(), Some("Carol Smith"));

        let Command::Provider { display_name, .. } = command("/provider c@d.co") else {
            panic!("expected a provider command");
        };
        assert_eq!(joined(&display_name), None);
    }

    #[test]
    fn conversation_commands() {
        assert_eq!(
            command("/open  Bob Smith "),
            Command::Open {
                name: vec!["Bob".into(), "Smith".into()]
            }
        );
        assert_eq!(error_kind("/open"), ErrorKind::MissingRequiredArgument);
        assert_eq!(command("/users"), Command::Users { query: Vec::new() });
        assert_eq!(command("/users al"), Command::Users { query: vec!["al".into()] });
        assert_eq!(command("/emoji 3"), Command::Emoji { index: Some(3) });
        assert_eq!(command("/emoji"), Command::Emoji { index: None });
        assert!(Input::parse("/emoji x").is_err());
        assert_eq!(command("/older"), Command::Older);
        assert_eq!(command("/exit"), Command::Quit);
    }

    #[test]
    fn profile_values_may_contain_spaces() {
        let Command::Profile(edit) = command("/profile --bio likes long walks --username alice") else {
            panic!("expected a profile command");
        };
        assert_eq!(edit.bio().as_deref(), Some("likes long walks"));
        assert_eq!(edit.username.as_deref(), Some("alice"));
        assert_eq!(edit.photo, None);

        assert_eq!(command("/profile"), Command::Profile(ProfileEdit::default()));
        assert!(ProfileEdit::default().is_empty());
        assert_eq!(error_kind("/profile --nickname x"), ErrorKind::UnknownArgument);
    }

    #[test]
    fn help_and_unknown_commands() {
        assert_eq!(error_kind("/help"), ErrorKind::DisplayHelp);
        assert_eq!(error_kind("/login --help"), ErrorKind::DisplayHelp);
        assert!(Input::parse("/dance").is_err());
    }
}
