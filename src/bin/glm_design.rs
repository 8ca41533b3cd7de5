/// glm_design: build a GLM design matrix from a session JSON file.
///
/// Registers one timing covariate per `--event` column, each convolved with
/// the same log-stretched raised-cosine basis, and writes the compiled matrix
/// plus binned spike counts to a safetensors file (see `neuroglm::write_design`).
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use neuroglm::{
    basis::nonlinear_raised_cosine, write_design, Amplitude, CovariateOptions, GlmConfig,
    NeuralGlm, SessionFile,
};

#[derive(Parser, Debug)]
#[command(name = "glm_design", about = "Design matrix for a Poisson GLM of spiking activity")]
struct Args {
    /// Session JSON (trial table, vartypes, spikes).
    #[arg(long)]
    session: PathBuf,

    /// Output safetensors path.
    #[arg(long)]
    output: PathBuf,

    /// Timing column to register as a covariate (repeatable).
    #[arg(long = "event", required = true)]
    events: Vec<String>,

    /// Bin width in seconds.
    #[arg(long, default_value_t = 0.02)]
    binwidth: f64,

    /// Units must fire in more than this many trials.
    #[arg(long, default_value_t = 100)]
    min_trials: usize,

    /// Number of raised-cosine basis functions per event.
    #[arg(long, default_value_t = 5)]
    n_bases: usize,

    /// Centre of the last basis function (s).
    #[arg(long, default_value_t = 0.4)]
    kernel_length: f64,

    /// Offset of the basis functions in bins (negative = anticipatory).
    #[arg(long, default_value_t = 0, allow_hyphen_values = true)]
    offset: isize,

    /// Scale each event by the value in this column (gain modulation).
    #[arg(long)]
    gain: Option<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let session = SessionFile::load(&args.session)?;
    let (table, vartypes, spike_times, spike_clusters) = session.into_parts()?;
    println!(
        "Loaded {} trials, {} columns, {} spikes",
        table.n_rows(),
        table.columns.len(),
        spike_times.len()
    );

    let cfg = GlmConfig {
        binwidth: args.binwidth,
        min_trials: args.min_trials,
        ..GlmConfig::default()
    };
    let glm = NeuralGlm::new(&table, &vartypes, &spike_times, &spike_clusters, cfg)?;
    for w in glm.warnings() {
        eprintln!("warning: {w}");
    }
    let n_units = glm.units().iter().filter(|u| u.included).count();
    println!(
        "{} trials kept, {n_units}/{} units fire in > {} trials",
        glm.trials().len(),
        glm.units().len(),
        args.min_trials
    );

    let bases = nonlinear_raised_cosine(args.n_bases, args.binwidth, (0.0, args.kernel_length), 0.05);
    let amplitude = match &args.gain {
        Some(col) => Amplitude::Column(col.clone()),
        None => Amplitude::Unit,
    };

    let mut covs = glm.covariates();
    for event in &args.events {
        let opts = CovariateOptions::default()
            .offset(args.offset)
            .description(format!("{event} with {} raised-cosine bases", args.n_bases));
        let cols = covs.add_covariate_timing(event, event, bases.clone(), amplitude.clone(), opts)?;
        println!("  {event:<24} columns {cols:?}");
    }
    let set = covs.build();

    let dm = glm.compile(&set)?;
    println!(
        "Design matrix {} x {} ({} non-zeros)",
        dm.n_rows(),
        dm.n_columns(),
        dm.matrix().nnz()
    );

    let spikes = glm.binned_spikes();
    write_design(&dm, Some(&spikes), &args.output)?;
    println!("Written → {}", args.output.display());

    Ok(())
}
