use clap::Parser;
use moteval_rs::{Error, EvalConfig, Evaluator, RunConfig, SequenceSpec};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "moteval",
    about = "Score multi-object-tracking predictions against ground truth (MOT trajectory format)",
    version = "0.1.0"
)]
struct Args {
    /// Path to a JSON run configuration; overrides the single-sequence flags
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Ground-truth trajectory file (single-sequence mode)
    #[arg(long, requires = "pred")]
    gt: Option<PathBuf>,

    /// Predicted trajectory file (single-sequence mode)
    #[arg(long, requires = "gt")]
    pred: Option<PathBuf>,

    /// Sequence name used in the report (single-sequence mode)
    #[arg(long, default_value = "sequence")]
    name: String,

    /// Expected frame count (single-sequence mode)
    #[arg(long)]
    seq_length: Option<u32>,

    /// Sequence info file supplying the frame count (single-sequence mode)
    #[arg(long)]
    seqinfo: Option<PathBuf>,

    /// Shift subtracted from raw frame numbers
    #[arg(long, default_value_t = 0)]
    frame_offset: i64,

    /// Minimum IoU for a match
    #[arg(long, default_value_t = 0.5)]
    iou_threshold: f64,

    /// Recognized class labels
    #[arg(long, value_delimiter = ',', default_values_t = vec![0u32, 1, 2, 3])]
    classes: Vec<u32>,

    /// Evaluate sequences on a thread pool
    #[arg(long)]
    parallel: bool,

    /// Emit the report as JSON instead of a table
    #[arg(long)]
    json: bool,
}

fn build_run_config(args: &Args) -> moteval_rs::Result<RunConfig> {
    if let Some(path) = &args.config {
        return RunConfig::from_file(path);
    }

    let (gt, pred) = match (&args.gt, &args.pred) {
        (Some(gt), Some(pred)) => (gt.clone(), pred.clone()),
        _ => {
            return Err(Error::Config(
                "pass --config FILE, or --gt and --pred for a single sequence".to_string(),
            ))
        }
    };

    let mut sequence = SequenceSpec::new(args.name.clone(), gt, pred);
    sequence.seq_length = args.seq_length;
    sequence.seqinfo = args.seqinfo.clone();
    sequence.frame_offset = args.frame_offset;

    Ok(RunConfig {
        evaluation: EvalConfig {
            iou_threshold: args.iou_threshold,
            classes: args.classes.clone(),
            parallel: args.parallel,
        },
        sequences: vec![sequence],
    })
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let args = Args::parse();

    let run_config = build_run_config(&args)?;
    let evaluator = Evaluator::new(run_config.evaluation)?;
    let report = evaluator.evaluate(&run_config.sequences)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", report);
    }

    Ok(())
}
