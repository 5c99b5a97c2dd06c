use clap::{ArgAction, Parser, Subcommand, ValueHint};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}",
    arg_required_else_help = true
)]
pub struct Args {
    /// Set output verbosity
    #[arg(short = 'v', long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as json
    #[arg(short, long, global = true)]
    pub json: bool,

    /// Disable colors in output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Provide custom config file
    #[arg(short, long, global = true, value_hint = ValueHint::FilePath)]
    pub config: Option<String>,

    /// Server URL, overrides the config file and PGREST_URL
    #[arg(short, long, global = true, value_hint = ValueHint::Url)]
    pub url: Option<String>,

    /// Bearer token sent as the Authorization header
    #[arg(short, long, global = true)]
    pub token: Option<String>,

    /// Schema profile to target
    #[arg(short, long, global = true)]
    pub schema: Option<String>,

    /// Set request headers (`Name: value`)
    #[arg(required = false, long, short = 'H', global = true)]
    pub header: Vec<String>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(clap::Args, Default)]
pub struct QueryArgs {
    /// Filter as `column=operator.value`, repeatable
    #[arg(required = false, short, long)]
    pub filter: Vec<String>,

    /// Sort key as `column[.asc|.desc][.nullsfirst|.nullslast]`, repeatable
    #[arg(required = false, short, long)]
    pub order: Vec<String>,

    /// Maximum number of rows
    #[arg(required = false, short, long)]
    pub limit: Option<u64>,

    /// Inclusive row window as `from-to`
    #[arg(required = false, short, long)]
    pub range: Option<String>,

    /// Expect a single row
    #[arg(required = false, long, conflicts_with = "maybe_single")]
    pub single: bool,

    /// Expect zero or one row
    #[arg(required = false, long)]
    pub maybe_single: bool,

    /// Count mode: exact, planned or estimated
    #[arg(required = false, long)]
    pub count: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Read rows from a table
    #[command(arg_required_else_help = true)]
    Select {
        /// Table or view name
        table: String,

        /// Columns to return
        #[arg(required = false, long, default_value = "*")]
        columns: String,

        /// Only report the count, skip the body
        #[arg(required = false, long, requires = "count")]
        head: bool,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Insert rows
    #[command(arg_required_else_help = true)]
    Insert {
        /// Table name
        table: String,

        /// JSON payload, or `-` to read it from stdin
        data: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Update rows matching the filters
    #[command(arg_required_else_help = true)]
    Update {
        /// Table name
        table: String,

        /// JSON payload, or `-` to read it from stdin
        data: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Insert rows, merging on conflict
    #[command(arg_required_else_help = true)]
    Upsert {
        /// Table name
        table: String,

        /// JSON payload, or `-` to read it from stdin
        data: String,

        /// Column used to detect conflicts
        #[arg(required = false, long)]
        on_conflict: Option<String>,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Delete rows matching the filters
    #[command(arg_required_else_help = true)]
    Delete {
        /// Table name
        table: String,

        #[command(flatten)]
        query: QueryArgs,
    },

    /// Call a stored function
    #[command(arg_required_else_help = true)]
    Rpc {
        /// Function name
        function: String,

        /// JSON arguments, or `-` to read them from stdin
        params: Option<String>,
    },

    /// Print the resolved configuration
    Config,
}
