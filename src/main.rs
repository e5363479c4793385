use clap::{Parser as ClapParser, Subcommand};
use orm_expr::cli::{self, CliError, EvalOptions, EvalResult, RenderOptions};
use std::io::{self, Read};

#[derive(ClapParser)]
#[command(name = "ormexp")]
#[command(about = "ormexp - evaluate and render ORM expression trees encoded as JSON")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate an expression tree against a JSON subject
    Eval {
        /// The JSON-encoded expression tree
        expression: String,

        /// JSON subject (reads from stdin if not provided)
        #[arg(short, long)]
        input: Option<String>,

        /// JSON object of named parameter values
        #[arg(long)]
        params: Option<String>,

        /// Treat the input as an array and print the matching elements
        #[arg(short, long)]
        filter: bool,

        /// Pretty-print the output
        #[arg(short, long)]
        pretty: bool,

        /// Only validate the tree, don't evaluate
        #[arg(long)]
        validate_only: bool,
    },

    /// Print an expression tree in canonical or portable form
    Render {
        /// The JSON-encoded expression tree
        expression: String,

        /// JSON object of named parameter values
        #[arg(long)]
        params: Option<String>,

        /// Render the portable query-language form
        #[arg(long)]
        portable: bool,

        /// Root alias for portable paths
        #[arg(long, default_value = "a")]
        root_alias: String,
    },
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Eval {
            expression,
            input,
            params,
            filter,
            pretty,
            validate_only,
        } => run_eval(expression, input, params, filter, pretty, validate_only),
        Commands::Render {
            expression,
            params,
            portable,
            root_alias,
        } => run_render(RenderOptions {
            expression,
            params,
            portable,
            root_alias,
        }),
    };

    if let Err(e) = result {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run_eval(
    expression: String,
    input: Option<String>,
    params: Option<String>,
    filter: bool,
    pretty: bool,
    validate_only: bool,
) -> Result<(), CliError> {
    let input = match input {
        Some(s) => Some(s),
        None if !validate_only && !atty::is(atty::Stream::Stdin) => {
            let mut buffer = String::new();
            io::stdin().read_to_string(&mut buffer)?;
            Some(buffer)
        }
        None => None,
    };

    let options = EvalOptions {
        expression,
        input,
        params,
        filter,
        validate_only,
    };

    match cli::execute_eval(&options)? {
        EvalResult::Valid(canonical) => println!("Valid: {}", canonical),
        EvalResult::Success(output) => {
            let json = if pretty {
                serde_json::to_string_pretty(&output)
            } else {
                serde_json::to_string(&output)
            }?;
            println!("{}", json);
        }
    }
    Ok(())
}

fn run_render(options: RenderOptions) -> Result<(), CliError> {
    let result = cli::execute_render(&options)?;
    println!("{}", result.text);
    for (index, parameter) in result.parameters.iter().enumerate() {
        println!("?{} = {}", index + 1, parameter);
    }
    Ok(())
}
