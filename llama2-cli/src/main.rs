use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use llama2_core::{Classifier, Transformer, TransformerBuilder};
use log::{error, info};

/// Define the inspect subcommand.
fn inspect_subcommand() -> Command {
    Command::new("inspect")
        .about("Load a llama2 binary checkpoint and print its layout")
        .arg(
            Arg::new("checkpoint")
                .help("Model checkpoint file")
                .required(true)
                .index(1),
        )
        .arg(
            Arg::new("chunk-size")
                .short('c')
                .long("chunk-size")
                .value_name("INT")
                .help("Streaming chunk cap in f32 elements [default: 16384]")
                .value_parser(clap::value_parser!(usize)),
        )
}

/// Run the inspect command with the provided arguments
fn run_inspect_command(matches: &ArgMatches) -> Result<()> {
    let checkpoint = matches.get_one::<String>("checkpoint").unwrap();

    let mut builder = TransformerBuilder::new(checkpoint);
    if let Some(&chunk_elems) = matches.get_one::<usize>("chunk-size") {
        builder = builder.with_chunk_elems(chunk_elems);
    }

    let transformer = builder.build()?;
    print_summary(checkpoint, &transformer);

    Ok(())
}

fn print_summary(checkpoint: &str, transformer: &Transformer) {
    let config = transformer.config();
    let weights = transformer.weights();

    info!("Checkpoint: {checkpoint}");
    info!("  dim:        {}", config.dim);
    info!("  hidden_dim: {}", config.hidden_dim);
    info!("  n_layers:   {}", config.n_layers);
    info!("  n_heads:    {}", config.n_heads);
    info!("  n_kv_heads: {}", config.n_kv_heads);
    info!("  vocab_size: {}", config.vocab_size);
    info!("  seq_len:    {}", config.seq_len);
    info!("  head_size:  {} (derived)", config.head_size);
    info!("  kv_dim:     {} (derived)", config.kv_dim);

    let tensors: [(&str, usize); 12] = [
        ("token_embedding_table", weights.token_embedding_table.len()),
        ("rms_att_weight", weights.rms_att_weight.len()),
        ("wq", weights.wq.len()),
        ("wk", weights.wk.len()),
        ("wv", weights.wv.len()),
        ("wo", weights.wo.len()),
        ("rms_ffn_weight", weights.rms_ffn_weight.len()),
        ("w1", weights.w1.len()),
        ("w2", weights.w2.len()),
        ("w3", weights.w3.len()),
        ("rms_final_weight", weights.rms_final_weight.len()),
        (
            "wcls",
            match &weights.wcls {
                Classifier::Owned(w) => w.len(),
                Classifier::SharedWithEmbedding => 0,
            },
        ),
    ];

    info!("Tensors:");
    let mut total = 0usize;
    for (name, elements) in tensors {
        total += elements;
        info!("  {name:<22} {elements:>12} elements");
    }

    match weights.wcls {
        Classifier::Owned(_) => info!("Classifier weights: owned"),
        Classifier::SharedWithEmbedding => {
            info!("Classifier weights: shared with token_embedding_table")
        }
    }
    info!("Total parameters: {total}");
}

fn execute_commands() -> Result<()> {
    // Initialize logger with clean format (no timestamp/module prefix)
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format(|buf, record| {
            use std::io::Write;
            writeln!(buf, "{}", record.args())
        })
        .init();

    let matches = Command::new("llama2")
        .about("llama2 CLI: load and inspect llama2 binary checkpoints")
        .subcommand(inspect_subcommand())
        .get_matches();

    match matches.subcommand() {
        Some(("inspect", matches)) => run_inspect_command(matches),
        _ => anyhow::bail!("No subcommand specified. Use -h to print help information."),
    }
}

fn main() {
    if let Err(e) = execute_commands() {
        error!("Error: {e:#}");
        std::process::exit(1);
    }
}
