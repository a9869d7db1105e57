use std::fs::{self, File};
use std::io::{self, BufRead, BufReader};
use std::process::ExitCode;

use admin_session::export::{self, ExportFormat};
use admin_session::navigator::Navigation;
use admin_session::resources::{self, Resource};
use admin_session::two_factor;
use admin_session::{
    AdminClient, AuthError, Body, ClientConfig, ConfigError, ErrorCode, HttpError, NavigationError, RequestOptions,
    SessionState, TwoFactorError,
};
use clap::{Args, Parser, Subcommand};
use serde_json::{Value, json};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Http(#[from] HttpError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    TwoFactor(#[from] TwoFactorError),
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error("login needs --username")]
    MissingUsername,
    #[error("--username given without --password")]
    MissingPassword,
    #[error("unknown resource `{0}`")]
    UnknownResource(String),
    #[error("unknown export format `{0}`; expected excel or word")]
    UnknownFormat(String),
    #[error("invalid query parameter `{0}`; expected key=value")]
    InvalidQuery(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("{context}: {source}")]
    Io { context: String, source: io::Error },
    #[error("script line {line}: {message}")]
    Script { line: usize, message: String },
    #[error("{failures} script command(s) failed")]
    ScriptFailed { failures: usize },
}

impl CliError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(e) => e.error_code(),
            Self::Http(e) => e.error_code(),
            Self::Auth(e) => e.error_code(),
            Self::TwoFactor(e) => e.error_code(),
            Self::Navigation(e) => e.error_code(),
            Self::MissingUsername => "E_MISSING_USERNAME",
            Self::MissingPassword => "E_MISSING_PASSWORD",
            Self::UnknownResource(_) => "E_UNKNOWN_RESOURCE",
            Self::UnknownFormat(_) => "E_UNKNOWN_FORMAT",
            Self::InvalidQuery(_) => "E_INVALID_QUERY",
            Self::InvalidJson(_) => "E_INVALID_JSON",
            Self::Io { .. } => "E_IO",
            Self::Script { .. } => "E_SCRIPT",
            Self::ScriptFailed { .. } => "E_SCRIPT_FAILED",
        }
    }

    fn io(context: impl Into<String>) -> impl FnOnce(io::Error) -> Self {
        let context = context.into();
        move |source| Self::Io { context, source }
    }
}

// =============================================================================
// ARGUMENTS
// =============================================================================

#[derive(Parser, Debug)]
#[command(name = "admin-cli", about = "Cafe admin API client with session-aware navigation")]
struct Cli {
    #[arg(long, env = "ADMIN_ORIGIN")]
    origin: Option<String>,

    #[arg(long, env = "ADMIN_API_BASE")]
    api_base: Option<String>,

    /// Log in as this user before running the command.
    #[arg(long, env = "ADMIN_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "ADMIN_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Command,
}

/// One line of a `script` input.
#[derive(Parser, Debug)]
#[command(name = "script", no_binary_name = true)]
struct ScriptLine {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the session and print the identity.
    Whoami,
    /// Run the navigation guard for a path.
    Visit { path: String },
    /// Log in and print the identity. Falls back to the global credentials.
    Login { username: Option<String>, password: Option<String> },
    Logout,
    Api(ApiCommand),
    Resource(ResourceCommand),
    Export(ExportArgs),
    Otp(OtpCommand),
    /// Run one command per line against a single session.
    Script {
        #[arg(long, default_value = "-", help = "Input file path, or - for stdin")]
        input: String,
    },
}

#[derive(Args, Debug)]
struct ApiCommand {
    #[command(subcommand)]
    command: ApiSubcommand,
}

#[derive(Subcommand, Debug)]
enum ApiSubcommand {
    Get(ApiArgs),
    Post(ApiArgs),
    Patch(ApiArgs),
    Delete(ApiArgs),
}

#[derive(Args, Debug)]
struct ApiArgs {
    path: String,
    #[arg(long)]
    data: Option<String>,
    #[arg(long = "query")]
    query: Vec<String>,
}

impl ApiArgs {
    fn json_data(&self) -> Result<Option<Value>, CliError> {
        Ok(self.data.as_deref().map(serde_json::from_str::<Value>).transpose()?)
    }
}

#[derive(Args, Debug)]
struct ResourceCommand {
    name: String,
    #[command(subcommand)]
    command: ResourceSubcommand,
}

#[derive(Subcommand, Debug)]
enum ResourceSubcommand {
    List {
        #[arg(long = "query")]
        query: Vec<String>,
    },
    Get {
        id: String,
    },
    Create {
        #[arg(long)]
        data: String,
    },
    Update {
        id: String,
        #[arg(long)]
        data: String,
    },
    Delete {
        id: String,
    },
    Stats,
}

#[derive(Args, Debug)]
struct ExportArgs {
    entity: String,
    #[arg(long, default_value = "excel")]
    format: String,
    #[arg(long, help = "Output path; defaults to the server-provided filename")]
    out: Option<String>,
    #[arg(long = "query")]
    query: Vec<String>,
}

#[derive(Args, Debug)]
struct OtpCommand {
    #[command(subcommand)]
    command: OtpSubcommand,
}

#[derive(Subcommand, Debug)]
enum OtpSubcommand {
    Status,
    Verify { code: String },
    Secret,
    Reset,
}

// =============================================================================
// MAIN
// =============================================================================

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("error [{}]: {error}", error.code());
            ExitCode::FAILURE
        }
    }
}

#[derive(Debug, Default)]
struct Credentials {
    username: Option<String>,
    password: Option<String>,
}

impl Credentials {
    fn pair(&self) -> Result<(&str, &str), CliError> {
        let username = self.username.as_deref().ok_or(CliError::MissingUsername)?;
        let password = self.password.as_deref().ok_or(CliError::MissingPassword)?;
        Ok((username, password))
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let client = AdminClient::new(build_config(&cli)?)?;
    let credentials = Credentials { username: cli.username, password: cli.password };

    if credentials.username.is_some() && !matches!(cli.command, Command::Login { .. }) {
        let (username, password) = credentials.pair()?;
        let identity = client.login(username, password).await?;
        tracing::info!(username = identity.username(), "logged in");
    }

    match cli.command {
        Command::Script { input } => run_script(&client, &input, &credentials).await,
        command => run_command(&client, command, &credentials).await,
    }
}

fn build_config(cli: &Cli) -> Result<ClientConfig, CliError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(origin) = &cli.origin {
        config = config.with_origin(origin)?;
    }
    if let Some(base) = &cli.api_base {
        config = config.with_api_base(base);
    }
    Ok(config)
}

async fn run_command(client: &AdminClient, command: Command, credentials: &Credentials) -> Result<(), CliError> {
    match command {
        Command::Whoami => print_json(&session_json(&client.resolve().await)),
        Command::Visit { path } => print_json(&navigation_json(&client.navigate(&path).await?)),
        Command::Login { username, password } => {
            let given = Credentials {
                username: username.or_else(|| credentials.username.clone()),
                password: password.or_else(|| credentials.password.clone()),
            };
            let (username, password) = given.pair()?;
            let identity = client.login(username, password).await?;
            print_json(&json!(identity))
        }
        Command::Logout => {
            client.logout().await?;
            print_json(&session_json(&client.session().state()))
        }
        Command::Api(api) => run_api(client, api).await,
        Command::Resource(resource) => run_resource(client, resource).await,
        Command::Export(args) => run_export(client, args).await,
        Command::Otp(otp) => run_otp(client, otp).await,
        Command::Script { .. } => Err(CliError::Script { line: 0, message: "scripts cannot be nested".to_owned() }),
    }
}

async fn run_api(client: &AdminClient, api: ApiCommand) -> Result<(), CliError> {
    let body = match api.command {
        ApiSubcommand::Get(args) => client.get(&args.path, query_options(&args.query)?).await?,
        ApiSubcommand::Post(args) => client.post(&args.path, args.json_data()?, query_options(&args.query)?).await?,
        ApiSubcommand::Patch(args) => {
            client.patch(&args.path, args.json_data()?, query_options(&args.query)?).await?
        }
        ApiSubcommand::Delete(args) => client.delete(&args.path, query_options(&args.query)?).await?,
    };
    print_json(&body_json(body))
}

async fn run_resource(client: &AdminClient, command: ResourceCommand) -> Result<(), CliError> {
    let resource = Resource::parse(&command.name).ok_or_else(|| CliError::UnknownResource(command.name.clone()))?;
    let value = match command.command {
        ResourceSubcommand::List { query } => resources::list(client, resource, query_options(&query)?).await?,
        ResourceSubcommand::Get { id } => resources::get(client, resource, &id).await?,
        ResourceSubcommand::Create { data } => resources::create(client, resource, serde_json::from_str(&data)?).await?,
        ResourceSubcommand::Update { id, data } => {
            resources::update(client, resource, &id, serde_json::from_str(&data)?).await?
        }
        ResourceSubcommand::Delete { id } => {
            resources::delete(client, resource, &id).await?;
            json!({ "deleted": id })
        }
        ResourceSubcommand::Stats => resources::stats(client, resource).await?,
    };
    print_json(&value)
}

async fn run_export(client: &AdminClient, args: ExportArgs) -> Result<(), CliError> {
    let format = ExportFormat::parse(&args.format).ok_or_else(|| CliError::UnknownFormat(args.format.clone()))?;
    let file = export::export(client, &args.entity, format, query_options(&args.query)?).await?;
    let out = args.out.unwrap_or_else(|| file.filename.clone());
    fs::write(&out, &file.bytes).map_err(CliError::io(format!("write {out}")))?;
    print_json(&json!({
        "filename": file.filename,
        "content_type": file.content_type,
        "bytes": file.bytes.len(),
        "written_to": out,
    }))
}

async fn run_otp(client: &AdminClient, otp: OtpCommand) -> Result<(), CliError> {
    let value = match otp.command {
        OtpSubcommand::Status => json!(two_factor::status(client).await?),
        OtpSubcommand::Verify { code } => json!(two_factor::verify(client, &code).await?),
        OtpSubcommand::Secret => json!(two_factor::secret(client).await?),
        OtpSubcommand::Reset => json!(two_factor::reset(client).await?),
    };
    print_json(&value)
}

// =============================================================================
// SCRIPT MODE
// =============================================================================

async fn run_script(client: &AdminClient, input: &str, credentials: &Credentials) -> Result<(), CliError> {
    let reader: Box<dyn BufRead> = if input == "-" {
        Box::new(BufReader::new(io::stdin()))
    } else {
        let file = File::open(input).map_err(CliError::io(format!("open {input}")))?;
        Box::new(BufReader::new(file))
    };

    let mut failures = 0_usize;
    for (index, line) in reader.lines().enumerate() {
        let number = index.saturating_add(1);
        let line = line.map_err(CliError::io("read input"))?;
        let words = split_words(&line).map_err(|message| CliError::Script { line: number, message })?;
        if words.is_empty() || words[0].starts_with('#') {
            continue;
        }

        let parsed = match ScriptLine::try_parse_from(&words) {
            Ok(parsed) => parsed,
            Err(error) => {
                return Err(CliError::Script { line: number, message: error.to_string() });
            }
        };
        if let Err(error) = run_command(client, parsed.command, credentials).await {
            failures = failures.saturating_add(1);
            eprintln!("line {number}: error [{}]: {error}", error.code());
        }
    }

    if failures > 0 {
        return Err(CliError::ScriptFailed { failures });
    }
    Ok(())
}

/// Split a script line into words, honoring single and double quotes.
fn split_words(line: &str) -> Result<Vec<String>, String> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.trim().chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }
    if quote.is_some() {
        return Err("unterminated quote".to_owned());
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

// =============================================================================
// OUTPUT
// =============================================================================

fn query_options(pairs: &[String]) -> Result<RequestOptions, CliError> {
    pairs.iter().try_fold(RequestOptions::default(), |options, pair| {
        let (key, value) = pair.split_once('=').ok_or_else(|| CliError::InvalidQuery(pair.clone()))?;
        if key.is_empty() {
            return Err(CliError::InvalidQuery(pair.clone()));
        }
        Ok(options.query(key, value))
    })
}

fn session_json(state: &SessionState) -> Value {
    match state {
        SessionState::Unknown => json!({ "state": "unknown" }),
        SessionState::Resolving => json!({ "state": "resolving" }),
        SessionState::Resolved(identity) => json!({ "state": "resolved", "identity": identity }),
    }
}

fn navigation_json(navigation: &Navigation) -> Value {
    json!({ "path": navigation.path, "redirects": navigation.redirects })
}

fn body_json(body: Body) -> Value {
    match body {
        Body::Empty => Value::Null,
        Body::Json(value) => value,
        Body::Binary(file) => json!({
            "content_type": file.content_type,
            "content_disposition": file.content_disposition,
            "bytes": file.bytes.len(),
        }),
    }
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
