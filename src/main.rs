use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use europepmc_client::config::{
    find_config_file, load_config, user_config_file, ConfigFile, EUROPE_PMC_TEST_URL,
};
use europepmc_client::models::{AuthorMatch, AuthorSearchResult, DisambiguatedPublication};
use europepmc_client::{
    AuthorDisambiguator, AuthorSearch, ClientError, DataSource, EuropePmcClient, PageOptions,
    PublicationRecord, RawResponse, ResultType, SearchFilters, SearchQuery, SortBy,
};
use futures_util::StreamExt;
use serde::Serialize;
use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Europe PMC client - search publications and disambiguate authors
#[derive(Parser, Debug)]
#[command(name = "europepmc")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(author = "hongkongkiwi")]
#[command(about = "Search Europe PMC and disambiguate authors", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging (can be used multiple times for more verbosity: -v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Output format
    #[arg(long, short, value_enum, global = true, default_value_t = OutputFormat::Auto)]
    output: OutputFormat,

    /// Configuration file path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the Europe PMC test endpoint
    #[arg(long, global = true)]
    test_api: bool,

    /// Requests per second
    #[arg(long, global = true)]
    rate: Option<f64>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Attempts per request, including the first
    #[arg(long, global = true)]
    max_attempts: Option<u32>,

    /// Abandon the command after this many seconds
    #[arg(long, global = true)]
    deadline: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for results
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum OutputFormat {
    /// Automatic based on terminal (table if TTY, JSON otherwise)
    Auto,
    /// Table format (human-readable)
    Table,
    /// JSON format (machine-readable)
    Json,
    /// Plain text format
    Plain,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Search publications with Europe PMC query syntax
    #[command(alias = "s")]
    Search {
        /// Query, e.g. 'CRISPR AND OPEN_ACCESS:Y'
        query: String,

        /// Result verbosity: idlist, lite or core
        #[arg(long, default_value = "lite")]
        result_type: ResultType,

        /// Results per page (at most 1000)
        #[arg(long, short, default_value_t = 25)]
        page_size: u32,

        /// Cursor mark from a previous page
        #[arg(long)]
        cursor: Option<String>,

        /// relevance, date, cited, or a raw sort expression
        #[arg(long)]
        sort: Option<SortBy>,

        /// Do not expand the query with synonyms
        #[arg(long)]
        no_synonym: bool,

        /// Follow cursor marks and print every matching record
        #[arg(long)]
        all: bool,

        /// Stop after this many records when using --all
        #[arg(long, requires = "all")]
        limit: Option<usize>,
    },

    /// Search with date, journal and access filters
    Advanced {
        /// Base query
        query: String,

        /// Earliest first publication date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,

        /// Latest first publication date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,

        /// Journal title
        #[arg(long, short)]
        journal: Option<String>,

        /// Only open access publications
        #[arg(long)]
        open_access: bool,

        /// Only publications with full text
        #[arg(long)]
        full_text: bool,

        /// Results per page (at most 1000)
        #[arg(long, short, default_value_t = 25)]
        page_size: u32,
    },

    /// Search publications by author, keeping confident matches only
    #[command(alias = "a")]
    Author {
        /// Author name
        name: String,

        /// Extra query terms, joined with AND
        #[arg(long)]
        terms: Option<String>,

        /// Publications to return
        #[arg(long, short, default_value_t = 25)]
        page_size: u32,

        /// Minimum match score (0-100)
        #[arg(long, short, default_value_t = AuthorSearch::DEFAULT_THRESHOLD)]
        threshold: u8,
    },

    /// Fetch one publication record
    Details {
        /// Source database (MED, PMC, PPR, ...)
        source: DataSource,
        /// Identifier within the source
        id: String,
        /// Data type appended to the path (default: core)
        #[arg(long)]
        data_type: Option<String>,
    },

    /// List records citing a publication
    Citations {
        source: DataSource,
        id: String,
        #[arg(long, short, default_value_t = 25)]
        page_size: u32,
        #[arg(long)]
        cursor: Option<String>,
    },

    /// List records cited by a publication
    References {
        source: DataSource,
        id: String,
        #[arg(long, short, default_value_t = 25)]
        page_size: u32,
        #[arg(long)]
        cursor: Option<String>,
    },

    /// List external database links of a publication
    Links { source: DataSource, id: String },

    /// Fetch full text XML (PMC only)
    Fulltext { source: DataSource, id: String },

    /// List supplementary files (PMC only)
    Supplementary { source: DataSource, id: String },

    /// Score candidate author names against a target name, offline
    Match {
        /// Target author name
        target: String,

        /// Candidate names
        #[arg(required = true)]
        candidates: Vec<String>,

        /// Minimum match score (default from config, else 80)
        #[arg(long, short)]
        threshold: Option<u8>,
    },

    /// Show or create the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommands {
    /// Print the effective configuration as TOML
    Show,

    /// Write a configuration file with default settings
    Init {
        /// Destination (default: <config dir>/europepmc/config.toml)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long, short)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration from file if specified or found in default locations
    let config_path = cli.config.clone().or_else(find_config_file);
    let file_config = load_config(config_path.as_deref())?;

    init_logging(&cli, &file_config);
    if let Some(path) = &config_path {
        tracing::debug!("Using config file: {}", path.display());
    }

    let mut client_config = file_config.client.clone();
    if cli.test_api {
        client_config.base_url = EUROPE_PMC_TEST_URL.to_string();
    }
    if let Some(rate) = cli.rate {
        client_config.requests_per_second = rate;
    }
    if let Some(timeout) = cli.timeout {
        client_config.timeout_secs = timeout;
    }
    if let Some(max_attempts) = cli.max_attempts {
        client_config.max_attempts = max_attempts;
    }

    let disambiguator =
        AuthorDisambiguator::with_initials_bonus(file_config.disambiguation.initials_bonus);
    let client = EuropePmcClient::with_config(client_config)?.with_disambiguator(disambiguator);

    let run = run_command(&cli, &client, &file_config);
    match cli.deadline {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), run)
            .await
            .map_err(|_| ClientError::DeadlineExceeded)??,
        None => run.await?,
    }

    Ok(())
}

fn init_logging(cli: &Cli, config: &ConfigFile) {
    // Initialize tracing based on verbosity
    let log_level = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let env_filter = if cli.quiet { "error" } else { log_level };

    let registry = tracing_subscriber::registry().with(tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| format!("europepmc_client={}", env_filter)),
    ));

    if config.logging.is_json() {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run_command(cli: &Cli, client: &EuropePmcClient, config: &ConfigFile) -> Result<()> {
    let format = resolve_format(cli.output);

    match &cli.command {
        Commands::Search {
            query,
            result_type,
            page_size,
            cursor,
            sort,
            no_synonym,
            all,
            limit,
        } => {
            let mut search = SearchQuery::new(query)
                .result_type(*result_type)
                .page_size(*page_size)
                .synonym(!*no_synonym);
            if let Some(cursor) = cursor {
                search = search.cursor_mark(cursor);
            }
            if let Some(sort) = sort {
                search = search.sort(sort.clone());
            }

            if *all {
                let limit = limit.unwrap_or(usize::MAX);
                let stream = client.search_stream(search).take(limit);
                futures_util::pin_mut!(stream);

                let mut publications = Vec::new();
                while let Some(record) = stream.next().await {
                    publications.push(record?);
                }
                output_publications(&publications, format)?;
            } else {
                let page = client.search_page(&search).await?;
                if format == OutputFormat::Json {
                    print_json(&page)?;
                } else {
                    output_publications(&page.publications, format)?;
                    if !cli.quiet {
                        print_page_footer(page.hit_count, page.next_cursor_mark.as_deref());
                    }
                }
            }
        }

        Commands::Advanced {
            query,
            from,
            to,
            journal,
            open_access,
            full_text,
            page_size,
        } => {
            let mut filters = SearchFilters::new()
                .open_access_only(*open_access)
                .has_full_text(*full_text);
            if let Some(from) = from {
                filters = filters.published_from(from);
            }
            if let Some(to) = to {
                filters = filters.published_to(to);
            }
            if let Some(journal) = journal {
                filters = filters.journal(journal);
            }

            let search = SearchQuery::new(query).page_size(*page_size);
            let result = client.advanced_search(&search, &filters).await?;
            if format == OutputFormat::Json {
                print_json(&result)?;
            } else {
                if !cli.quiet {
                    println!("Query: {}", result.final_query);
                }
                output_publications(&result.page.publications, format)?;
                if !cli.quiet {
                    print_page_footer(result.page.hit_count, result.page.next_cursor_mark.as_deref());
                }
            }
        }

        Commands::Author {
            name,
            terms,
            page_size,
            threshold,
        } => {
            let mut search = AuthorSearch::new(name)
                .page_size(*page_size)
                .threshold(*threshold);
            if let Some(terms) = terms {
                search = search.additional_terms(terms);
            }

            let result = client.search_author_publications(&search).await?;
            output_author_result(&result, format, cli.quiet)?;
        }

        Commands::Details {
            source,
            id,
            data_type,
        } => {
            let response = client
                .get_publication_details(*source, id, data_type.as_deref())
                .await?;
            output_raw(&response, format)?;
        }

        Commands::Citations {
            source,
            id,
            page_size,
            cursor,
        } => {
            let page = page_options(*page_size, cursor.as_deref());
            let response = client.get_citations(*source, id, &page).await?;
            output_raw(&response, format)?;
        }

        Commands::References {
            source,
            id,
            page_size,
            cursor,
        } => {
            let page = page_options(*page_size, cursor.as_deref());
            let response = client.get_references(*source, id, &page).await?;
            output_raw(&response, format)?;
        }

        Commands::Links { source, id } => {
            let response = client.get_database_links(*source, id).await?;
            output_raw(&response, format)?;
        }

        Commands::Fulltext { source, id } => {
            let response = client.get_full_text_xml(*source, id).await?;
            output_raw(&response, format)?;
        }

        Commands::Supplementary { source, id } => {
            let response = client.get_supplementary_files(*source, id).await?;
            output_raw(&response, format)?;
        }

        Commands::Match {
            target,
            candidates,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.disambiguation.default_threshold);
            let matches = client
                .disambiguator()
                .match_authors(target, candidates, threshold)?;
            tracing::info!(
                "{} of {} candidates matched {:?}",
                matches.len(),
                candidates.len(),
                target
            );
            output_matches(&matches, format)?;
        }

        Commands::Config { command } => match command {
            ConfigCommands::Show => {
                let mut effective = config.clone();
                effective.client = client.config().clone();
                print!("{}", effective.to_toml()?);
            }
            ConfigCommands::Init { path, force } => {
                let Some(path) = path.clone().or_else(user_config_file) else {
                    anyhow::bail!("no user config directory; pass a path");
                };
                if path.exists() && !*force {
                    anyhow::bail!("{} already exists; use --force to overwrite", path.display());
                }
                ConfigFile::default().save(&path)?;
                println!("Wrote {}", path.display());
            }
        },
    }

    Ok(())
}

fn page_options(page_size: u32, cursor: Option<&str>) -> PageOptions {
    let page = PageOptions::new(page_size);
    match cursor {
        Some(cursor) => page.cursor_mark(cursor),
        None => page,
    }
}

fn resolve_format(format: OutputFormat) -> OutputFormat {
    if format == OutputFormat::Auto {
        if std::io::stdout().is_terminal() {
            OutputFormat::Table
        } else {
            OutputFormat::Json
        }
    } else {
        format
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_page_footer(hit_count: u64, next_cursor_mark: Option<&str>) {
    println!("{} hits", hit_count);
    if let Some(cursor) = next_cursor_mark {
        println!("Next page: --cursor '{}'", cursor);
    }
}

/// Shorten to `max` characters, marking the cut with `...`
fn truncate_chars(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        let kept: String = text.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        text.to_string()
    }
}

fn authors_label(publication: &PublicationRecord) -> String {
    let names = publication.author_names();
    if names.is_empty() {
        publication.author_string.clone().unwrap_or_default()
    } else {
        names.join(", ")
    }
}

fn record_id(publication: &PublicationRecord) -> String {
    match (&publication.source, &publication.id) {
        (Some(source), Some(id)) => format!("{}:{}", source, id),
        (None, Some(id)) => id.clone(),
        _ => String::new(),
    }
}

fn output_publications(publications: &[PublicationRecord], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(&publications)?,
        OutputFormat::Plain => {
            for publication in publications {
                println!("{} - {}", publication.title, authors_label(publication));
                println!("  ID: {}", record_id(publication));
                if let Some(ref doi) = publication.doi {
                    println!("  DOI: {}", doi);
                }
                if let Some(ref date) = publication.publication_date {
                    println!("  Published: {}", date);
                }
                println!();
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["ID", "Title", "Authors", "Journal", "Date"]);

            for publication in publications {
                table.add_row(vec![
                    Cell::new(record_id(publication)),
                    Cell::new(truncate_chars(&publication.title, 50)).add_attribute(Attribute::Bold),
                    Cell::new(truncate_chars(&authors_label(publication), 30)),
                    Cell::new(truncate_chars(
                        publication.journal.title.as_deref().unwrap_or_default(),
                        25,
                    )),
                    Cell::new(publication.publication_date.clone().unwrap_or_default()),
                ]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

fn output_author_result(
    result: &AuthorSearchResult,
    format: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let publications: &[DisambiguatedPublication] = &result.publications;

    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(result)?,
        OutputFormat::Plain => {
            for entry in publications {
                let matched: Vec<String> = entry
                    .author_matches
                    .iter()
                    .map(|m| format!("{} ({})", m.candidate, m.score))
                    .collect();
                println!("[{}] {}", entry.best_match_score, entry.publication.title);
                println!("  ID: {}", record_id(&entry.publication));
                println!("  Matched: {}", matched.join(", "));
                println!();
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Attribute, Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Score", "ID", "Title", "Matched author"]);

            for entry in publications {
                let best = entry
                    .author_matches
                    .first()
                    .map(|m| m.candidate.as_str())
                    .unwrap_or_default();
                table.add_row(vec![
                    Cell::new(entry.best_match_score).add_attribute(Attribute::Bold),
                    Cell::new(record_id(&entry.publication)),
                    Cell::new(truncate_chars(&entry.publication.title, 50)),
                    Cell::new(best),
                ]);
            }
            println!("{table}");
        }
    }

    if !quiet && format != OutputFormat::Json {
        println!(
            "{} of {} publications matched {:?} at threshold {}",
            result.after_disambiguation,
            result.total_found,
            result.author_searched,
            result.disambiguation_threshold
        );
    }
    Ok(())
}

fn output_matches(matches: &[AuthorMatch], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json | OutputFormat::Auto => print_json(&matches)?,
        OutputFormat::Plain => {
            for m in matches {
                println!("{}\t{}", m.score, m.candidate);
            }
        }
        OutputFormat::Table => {
            use comfy_table::{Cell, Table};
            let mut table = Table::new();
            table.load_preset(comfy_table::presets::UTF8_FULL);
            table.set_header(vec!["Score", "Candidate"]);
            for m in matches {
                table.add_row(vec![Cell::new(m.score), Cell::new(&m.candidate)]);
            }
            println!("{table}");
        }
    }
    Ok(())
}

/// Raw responses have no fixed shape; plain output prints wrapped text bodies as-is
fn output_raw(response: &RawResponse, format: OutputFormat) -> Result<()> {
    match (format, response.text_content()) {
        (OutputFormat::Plain, Some(text)) => println!("{}", text),
        _ => print_json(response.body())?,
    }
    Ok(())
}
