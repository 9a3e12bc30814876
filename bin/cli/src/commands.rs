use clap::{
    Arg, ArgAction, ColorChoice, Command,
    builder::{
        PossibleValuesParser,
        styling::{AnsiColor, Effects, Styles},
    },
};

pub fn new() -> Command {
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default() | Effects::BOLD)
        .usage(AnsiColor::Green.on_default() | Effects::BOLD)
        .literal(AnsiColor::Blue.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::Green.on_default());

    Command::new("roadfleet")
        .about("Sign in to roadfleet and check role-based access")
        .version(env!("CARGO_PKG_VERSION"))
        .color(ColorChoice::Auto)
        .styles(styles)
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api-url")
                .long("api-url")
                .help("Backend base URL, overrides ROADFLEET__API__BASE_URL")
                .global(true),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Request timeout in seconds")
                .value_parser(clap::value_parser!(u64).range(1..))
                .global(true),
        )
        .arg(
            Arg::new("storage-dir")
                .long("storage-dir")
                .help("Directory holding the persisted session")
                .value_parser(clap::value_parser!(std::path::PathBuf))
                .global(true),
        )
        .subcommand(
            Command::new("login")
                .about("Sign in with email and password")
                .arg(email())
                .arg(password()),
        )
        .subcommand(
            Command::new("register")
                .about("Create an account, or sign in if it already exists")
                .arg(
                    Arg::new("name")
                        .short('n')
                        .long("name")
                        .help("Display name")
                        .required(true),
                )
                .arg(email())
                .arg(password()),
        )
        .subcommand(Command::new("logout").about("Sign out and forget the local session"))
        .subcommand(
            Command::new("whoami")
                .about("Show the signed-in user")
                .arg(
                    Arg::new("remote")
                        .long("remote")
                        .help("Ask the server instead of trusting the local copy")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(Command::new("refresh").about("Exchange the session token for a new one"))
        .subcommand(
            Command::new("check")
                .about("Check whether the signed-in user may access content requiring a role")
                .arg(
                    Arg::new("role")
                        .short('r')
                        .long("role")
                        .help("Minimum role required")
                        .default_value("worker")
                        .value_parser(PossibleValuesParser::new([
                            "worker",
                            "company_admin",
                            "super_admin",
                        ])),
                ),
        )
}

fn email() -> Arg {
    Arg::new("email")
        .short('e')
        .long("email")
        .help("Account email")
        .env("ROADFLEET_EMAIL")
        .required(true)
}

fn password() -> Arg {
    Arg::new("password")
        .short('p')
        .long("password")
        .help("Account password")
        .env("ROADFLEET_PASSWORD")
        .hide_env_values(true)
        .required(true)
}
