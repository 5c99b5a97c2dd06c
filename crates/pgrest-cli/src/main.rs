use std::{process::ExitCode, sync::PoisonError};

use clap::Parser;
use cli::{Args, Commands, QueryArgs};
use error::CliResult;
use logging::setup_logging;
use nu_ansi_term::Color::Red;
use pgrest::{
    prelude::*,
    query::{state::Mutation, Count},
};
use tracing::{debug, error};
use utils::{parse_header, read_json, Colored, COLOR};

mod cli;
mod error;
mod logging;
mod query;
mod utils;

fn load_config(args: &Args) -> CliResult<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    if let Some(url) = &args.url {
        config.url = Some(url.clone());
    }
    if let Some(schema) = &args.schema {
        config.schema = Some(schema.clone());
    }
    for header in &args.header {
        let (name, value) = parse_header(header)?;
        config.headers.insert(name, value);
    }

    Ok(config)
}

fn connect(config: &Config, token: Option<&str>) -> CliResult<Client> {
    let client = Client::from_config(config)?;
    if let Some(token) = token {
        client.set_auth(token);
    }
    Ok(client)
}

fn count_of(query: &QueryArgs) -> CliResult<Option<Count>> {
    query.count.as_deref().map(query::parse_count).transpose()
}

/// Builds a table query. Mutations return every column of the affected rows.
fn table_query(
    client: &Client,
    table: &str,
    mutation: Option<Mutation>,
    columns: &str,
    head: bool,
    query: &QueryArgs,
) -> CliResult<QueryBuilder> {
    let options = SelectOptions {
        count: count_of(query)?,
        head,
    };
    let builder = client.from(table).select_with(columns, options);

    let builder = match mutation {
        Some(Mutation::Insert(payload)) => builder.insert(payload),
        Some(Mutation::Update(payload)) => builder.update(payload),
        Some(Mutation::Upsert {
            payload,
            on_conflict,
        }) => builder.upsert_with(payload, UpsertOptions { on_conflict }),
        Some(Mutation::Delete) => builder.delete(),
        None => builder,
    };

    query::apply(builder, query)
}

async fn handle_cli() -> CliResult<bool> {
    let args = Args::parse();

    setup_logging(&args);

    if args.no_color {
        let mut color = COLOR.write().unwrap_or_else(PoisonError::into_inner);
        *color = false;
    }

    let config = load_config(&args)?;
    let client = || connect(&config, args.token.as_deref());

    let response = match &args.command {
        Commands::Config => {
            print!("{}", config.to_toml()?);
            return Ok(true);
        }
        Commands::Select {
            table,
            columns,
            head,
            query,
        } => table_query(&client()?, table, None, columns, *head, query)?.await?,
        Commands::Insert {
            table,
            data,
            query,
        } => {
            let mutation = Mutation::Insert(read_json(data)?);
            table_query(&client()?, table, Some(mutation), "*", false, query)?.await?
        }
        Commands::Update {
            table,
            data,
            query,
        } => {
            let mutation = Mutation::Update(read_json(data)?);
            table_query(&client()?, table, Some(mutation), "*", false, query)?.await?
        }
        Commands::Upsert {
            table,
            data,
            on_conflict,
            query,
        } => {
            let mutation = Mutation::Upsert {
                payload: read_json(data)?,
                on_conflict: on_conflict.clone(),
            };
            table_query(&client()?, table, Some(mutation), "*", false, query)?.await?
        }
        Commands::Delete {
            table,
            query,
        } => {
            let mutation = Mutation::Delete;
            table_query(&client()?, table, Some(mutation), "*", false, query)?.await?
        }
        Commands::Rpc {
            function,
            params,
        } => {
            let params = params.as_deref().map(read_json).transpose()?;
            client()?.rpc(function, params).await?
        }
    };

    debug!("status {:?}, count {:?}", response.status, response.count);
    println!("{}", serde_json::to_string_pretty(&response)?);

    match &response.error {
        Some(err) => {
            error!("{}", Colored(Red, &err.message));
            Ok(false)
        }
        None => Ok(true),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(2)
                .build(),
        )
    }))
    .ok();

    match handle_cli().await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("{:?}", miette::Report::new(err));
            ExitCode::FAILURE
        }
    }
}
