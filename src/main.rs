//! Command-line interface for xsdpile

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
use xsdpile::{Limits, SchemaPile};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdpile")]
#[command(author, version, about = "Resolve and assemble an XML Schema pile", long_about = None)]
struct Cli {
    /// Schema paths, catalog paths, file: URIs or namespace URIs, in any order
    #[arg(value_name = "ARG", required = true)]
    args: Vec<String>,

    /// Output as JSON
    #[arg(short, long)]
    json: bool,

    /// Also report every reachable catalog and its validation messages
    #[arg(short, long)]
    catalogs: bool,

    /// Use the strict limit preset
    #[arg(long)]
    strict: bool,
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn run(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    let limits = if cli.strict { Limits::strict() } else { Limits::default() };
    let pile = SchemaPile::with_limits(&cli.args, limits)?;

    if cli.json {
        print_pile_json(&pile, cli.catalogs)
    } else {
        print_pile_summary(&pile, cli.catalogs);
        Ok(())
    }
}

#[cfg(feature = "cli")]
fn display_relative(pile: &SchemaPile, url: &url::Url) -> String {
    pile.relative_path(url)
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| url.to_string())
}

#[cfg(feature = "cli")]
fn print_pile_summary(pile: &SchemaPile, show_catalogs: bool) {
    println!("=== Schema Pile ===");
    match pile.pile_root() {
        Some(root) => println!("Root: {}", root.display()),
        None => println!("Root: (empty pile)"),
    }

    println!("\n=== Initial Catalogs ===");
    for catalog in pile.initial_catalogs() {
        println!("  {}", display_relative(pile, catalog));
    }

    println!("\n=== Initial Schema Documents ===");
    for doc in pile.initial_schema_documents() {
        println!("  {}", display_relative(pile, doc));
    }

    println!("\n=== Namespaces ===");
    for doc in pile.all_schema_documents() {
        let version = if doc.version().is_empty() {
            String::new()
        } else {
            format!(" (version {})", doc.version())
        };
        println!(
            "  {} -> {}{}",
            doc.target_namespace(),
            display_relative(pile, doc.url()),
            version
        );
    }

    if !pile.warnings().is_empty() {
        println!("\n=== Warnings ===");
        for warning in pile.warnings() {
            println!("  - {}", warning);
        }
    }

    let messages = pile.assembled_model().messages();
    if !messages.is_empty() {
        println!("\n=== Loader Messages ===");
        for message in messages {
            println!("  - {}", message);
        }
    }

    if show_catalogs {
        println!("\n=== Catalog Files ===");
        for catalog in pile.all_catalog_files() {
            println!("  {}", display_relative(pile, &catalog));
        }
        let problems = pile.all_catalog_validation_messages();
        if !problems.is_empty() {
            println!("\n=== Catalog Problems ===");
            for problem in problems {
                println!("  - {}", problem);
            }
        }
    }
}

#[cfg(feature = "cli")]
fn print_pile_json(pile: &SchemaPile, show_catalogs: bool) -> Result<(), Box<dyn std::error::Error>> {
    use serde_json::{json, Map, Value};

    let mut output = Map::new();
    output.insert(
        "root".to_string(),
        json!(pile.pile_root().map(|p| p.display().to_string())),
    );
    output.insert("initialCatalogs".to_string(), json!(pile.initial_catalogs()));
    output.insert(
        "initialSchemaDocuments".to_string(),
        json!(pile.initial_schema_documents()),
    );
    output.insert(
        "initialNamespaceURIs".to_string(),
        json!(pile.initial_namespace_uris()),
    );

    let mut namespaces = Map::new();
    for doc in pile.all_schema_documents() {
        namespaces.insert(
            doc.target_namespace().to_string(),
            json!({
                "document": display_relative(pile, doc.url()),
                "version": doc.version(),
                "imports": doc.imports(),
            }),
        );
    }
    output.insert("namespaces".to_string(), Value::Object(namespaces));
    output.insert("warnings".to_string(), json!(pile.warnings()));
    output.insert(
        "loaderMessages".to_string(),
        json!(pile.assembled_model().messages()),
    );

    if show_catalogs {
        output.insert("catalogFiles".to_string(), json!(pile.all_catalog_files()));
        output.insert(
            "catalogProblems".to_string(),
            json!(pile.all_catalog_validation_messages()),
        );
    }

    println!("{}", serde_json::to_string_pretty(&Value::Object(output))?);
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
