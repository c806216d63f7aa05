use clap::{ArgAction, Parser};

#[derive(Parser, Debug, Clone)]
#[command(
    name = "volshelf",
    version,
    about = "terminal controller for a volume server's category shelves",
    long_about = "Volshelf drives the home-page endpoints of a volume-archive server: it loads and unloads category panels, filters the loaded rows, and can shut the server down.\n\nExamples:\n  volshelf -u http://127.0.0.1:8080/ --cat fiction -t fiction\n  volshelf -u http://127.0.0.1:8080/ -t fiction -t nonfiction --find dune\n  volshelf --config ~/.volshelf/config.yml --quit\n\nTip: Use --config to persist the server URL and category list."
)]
pub struct CliArgs {
    #[arg(
        short = 'u',
        long = "u",
        visible_alias = "url",
        value_name = "URL",
        help_heading = "Input",
        help = "Base URL of the volume server."
    )]
    pub url: Option<String>,

    #[arg(
        short = 'C',
        long = "cfg",
        visible_alias = "config",
        value_name = "FILE",
        help_heading = "Input",
        help = "Path to config file (defaults to ~/.volshelf/config.yml)."
    )]
    pub config: Option<String>,

    #[arg(
        long = "cat",
        visible_alias = "category",
        value_name = "NAME",
        action = ArgAction::Append,
        help_heading = "Input",
        help = "Register a category panel (repeatable, merged with config)."
    )]
    pub categories: Vec<String>,

    #[arg(
        short = 't',
        long = "tg",
        visible_alias = "toggle",
        value_name = "NAME",
        action = ArgAction::Append,
        help_heading = "Actions",
        help = "Toggle a category panel: load if unloaded, unload if loaded (repeatable)."
    )]
    pub toggle: Vec<String>,

    #[arg(
        short = 'q',
        long = "quit",
        help_heading = "Actions",
        help = "Fetch the quit page, then fire the server shutdown action."
    )]
    pub quit: bool,

    #[arg(
        short = 'f',
        long = "find",
        visible_alias = "query",
        value_name = "TEXT",
        help_heading = "Search",
        help = "Filter the loaded rows with the search collaborator."
    )]
    pub find: Option<String>,

    #[arg(
        long = "timeout",
        value_name = "SECONDS",
        help_heading = "HTTP",
        help = "Per-request timeout in seconds."
    )]
    pub timeout: Option<usize>,

    #[arg(
        short = 'p',
        long = "proxy",
        value_name = "URL",
        help_heading = "HTTP",
        help = "Route requests through this HTTP proxy."
    )]
    pub proxy: Option<String>,

    #[arg(
        long = "fr",
        visible_alias = "follow-redirects",
        help_heading = "HTTP",
        help = "Follow redirects (up to 10)."
    )]
    pub follow_redirects: bool,

    #[arg(
        short = 'o',
        long = "o",
        visible_alias = "output",
        value_name = "FILE",
        help_heading = "Output",
        help = "Write the shelf snapshot to a file after the actions run."
    )]
    pub output: Option<String>,

    #[arg(
        long = "of",
        visible_alias = "output-format",
        value_name = "FORMAT",
        help_heading = "Output",
        help = "Output format: text or json (inferred from --o extension by default)."
    )]
    pub output_format: Option<String>,

    #[arg(
        long = "nc",
        visible_alias = "no-color",
        help_heading = "Output",
        help = "Disable colored output."
    )]
    pub no_color: bool,

    #[arg(
        short = 'c',
        long = "clr",
        visible_alias = "color",
        help_heading = "Output",
        help = "Enable colored output (overrides --no-color)."
    )]
    pub color: bool,
}
