use std::ffi::OsStr;

use clap::{builder::TypedValueParser, error::ErrorKind, value_parser, Parser, Subcommand};

use twofa::{
    config::{DATA_DIR_ENV, DEFAULT_DATA_DIR},
    hotp::{Digits, MAX_DIGITS, MIN_DIGITS},
};

#[derive(Clone)]
struct DigitsParser {}

impl DigitsParser {
    pub fn new() -> Self {
        Self {}
    }

    fn parse(&self, value: &OsStr) -> Result<Digits, clap::Error> {
        let value = value.to_str().ok_or(clap::Error::raw(
            ErrorKind::InvalidUtf8,
            "Could not parse digits argument to string.",
        ))?;

        let value: u8 = value.parse().map_err(|_| {
            clap::Error::raw(ErrorKind::InvalidValue, "Digits must be a positive integer.")
        })?;

        let digits = Digits::new(value).ok_or(clap::Error::raw(
            ErrorKind::ValueValidation,
            format!("Digits must be between {} and {}.", MIN_DIGITS, MAX_DIGITS),
        ))?;

        Ok(digits)
    }
}

impl TypedValueParser for DigitsParser {
    type Value = Digits;

    fn parse_ref(
        &self,
        cmd: &clap::Command,
        _arg: Option<&clap::Arg>,
        value: &std::ffi::OsStr,
    ) -> Result<Self::Value, clap::Error> {
        let mut c = cmd.clone();
        self.parse(value)
            .map_err(|err| err.with_cmd(cmd).format(&mut c))
    }
}

#[derive(Clone, Debug, Parser)]
pub struct AddArgs {
    #[arg(short, long, help = "The website/service that issued this secret.")]
    pub issuer: Option<String>,

    #[arg(
        short,
        long,
        help = "The email/username for the account associated with this secret."
    )]
    pub account: Option<String>,

    #[arg(
            short,
            long,
            value_parser = DigitsParser::new(),
            help = "The number of digits in each code, must be between 6 and 8"
        )]
    pub digits: Option<Digits>,

    #[arg(short, long, value_parser = value_parser!(u64).range(1..), help = "How often (in seconds) a new code is generated.", default_value = "30")]
    pub period: u64,
}

#[derive(Clone, Debug, Parser)]
pub struct EditArgs {
    #[arg(help = "Index or issuer of the account to edit.")]
    pub target: String,

    #[arg(short, long, help = "New issuer; prompted for when omitted.")]
    pub issuer: Option<String>,

    #[arg(short, long, help = "New account label; prompted for when omitted.")]
    pub account: Option<String>,

    #[arg(short, long, value_parser = DigitsParser::new(), help = "New number of digits.")]
    pub digits: Option<Digits>,

    #[arg(short, long, value_parser = value_parser!(u64).range(1..), help = "New period in seconds.")]
    pub period: Option<u64>,
}

#[derive(Clone, Debug, Parser)]
pub struct TargetArgs {
    #[arg(help = "Index or issuer of the account.")]
    pub target: String,
}

#[derive(Clone, Debug, Parser)]
pub struct ShowArgs {
    #[arg(help = "Index or issuer of the account to select on start.")]
    pub target: Option<String>,
}

#[derive(Debug, Subcommand)]
pub enum Action {
    /// Add an account; the secret is read from stdin without echo.
    Add(AddArgs),
    /// Replace the fields of an account.
    Edit(EditArgs),
    /// Delete an account.
    Delete(TargetArgs),
    /// Delete every account.
    Clear,
    /// List all accounts.
    List,
    /// Print the otpauth:// enrollment URI of an account.
    Uri(TargetArgs),
    /// Show live codes, refreshed every second.
    Show(ShowArgs),
}

#[derive(Debug, Parser)]
#[command(about = "Keep two-factor secrets and show their current codes.")]
pub struct Cli {
    #[arg(
        long,
        global = true,
        env = DATA_DIR_ENV,
        default_value = DEFAULT_DATA_DIR,
        help = "Directory the account store lives in."
    )]
    data_dir: String,

    #[command(subcommand)]
    action: Action,
}

impl Cli {
    pub fn get_action(&self) -> &Action {
        &self.action
    }

    pub fn get_data_dir(&self) -> &str {
        &self.data_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_add_with_defaults() {
        let cli = Cli::try_parse_from(["twofa", "add", "--issuer", "GitHub"]).unwrap();

        match cli.get_action() {
            Action::Add(args) => {
                assert_eq!(args.issuer.as_deref(), Some("GitHub"));
                assert_eq!(args.period, 30);
                assert!(args.digits.is_none());
            }
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn rejects_out_of_range_parameters() {
        assert!(Cli::try_parse_from(["twofa", "add", "--digits", "9"]).is_err());
        assert!(Cli::try_parse_from(["twofa", "add", "--period", "0"]).is_err());

        let cli = Cli::try_parse_from(["twofa", "edit", "0", "-d", "8"]).unwrap();
        match cli.get_action() {
            Action::Edit(args) => assert_eq!(args.digits.map(|d| d.get()), Some(8)),
            other => panic!("unexpected action {:?}", other),
        }
    }

    #[test]
    fn data_dir_is_global() {
        let cli = Cli::try_parse_from(["twofa", "list", "--data-dir", "/tmp/accounts"]).unwrap();
        assert_eq!(cli.get_data_dir(), "/tmp/accounts");
    }
}
