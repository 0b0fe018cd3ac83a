use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::{Builder, Env};
use log::{error, info};
use polyreg::core::{
    DescentConfig, InitStrategy, LinkFunction, Matrix, RegressionError, RegressionResult,
    TrainingConfig,
};
use polyreg::data::{load_mnist, Dataset, SplitOptions};
use polyreg::io::{
    model_curve, save_model, write_curve_file, CostTraceWriter, ModelSnapshot, PenaltySweepWriter,
};
use polyreg::linear::{LinearRegression, LogisticRegression, ModelFamily, RegressionModel};
use polyreg::metrics::{Averaging, ClassificationReport, ConfusionMatrix};

const COST_FILE: &str = "cost.dat";
const LAMBDA_COST_FILE: &str = "lamda_cost.dat";
const MODEL_FILE: &str = "model.dat";

/// Penalties tried by `--lambda-sweep` when no values are given.
const DEFAULT_SWEEP: [f64; 10] = [0.0, 0.1, 0.3, 0.6, 1.0, 3.0, 6.0, 10.0, 30.0, 60.0];

#[derive(Parser)]
#[command(name = "polyreg")]
#[command(about = "Polynomial linear and logistic regression by batch gradient descent")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit a linear model to a whitespace-delimited data file
    Linear {
        /// One instance per line, target in the last column
        data: PathBuf,

        /// Step along feature 0 when writing the fitted curve
        #[arg(long, default_value = "1.0")]
        resolution: f64,

        #[command(flatten)]
        train: TrainArgs,
    },
    /// Fit a sigmoid or softmax classifier and report its test scores
    Logistic {
        /// One instance per line, label in the last column
        #[arg(required_unless_present = "mnist", conflicts_with = "mnist")]
        data: Option<PathBuf>,

        /// Directory holding the four MNIST IDX files
        #[arg(long)]
        mnist: Option<PathBuf>,

        /// How per-class scores are combined (default: binary for sigmoid, macro for softmax)
        #[arg(long, value_enum)]
        averaging: Option<AveragingArg>,

        #[command(flatten)]
        train: TrainArgs,
    },
}

#[derive(Args)]
struct TrainArgs {
    /// JSON training configuration, overridden by the flags below
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Polynomial degree
    #[arg(short, long)]
    degree: Option<u32>,

    #[arg(long)]
    learning_rate: Option<f64>,

    /// L2 penalty
    #[arg(long)]
    lambda: Option<f64>,

    /// Stop once the cost changes by at most this much
    #[arg(long)]
    delta: Option<f64>,

    /// Iteration cap (0 = unbounded)
    #[arg(long)]
    max_iterations: Option<usize>,

    #[arg(long)]
    threshold: Option<f64>,

    /// sigmoid or softmax
    #[arg(long)]
    link: Option<LinkFunction>,

    /// Seed for the shuffle and for random initialization
    #[arg(long)]
    seed: Option<u64>,

    /// Directory for cost.dat, lamda_cost.dat and model.dat
    #[arg(short, long, default_value = "Output")]
    output: PathBuf,

    /// Refit once per penalty (comma separated, defaults to 0 through 60)
    #[arg(long, num_args = 0.., value_delimiter = ',')]
    lambda_sweep: Option<Vec<f64>>,

    /// Write the fitted model as a JSON snapshot
    #[arg(long)]
    save_model: Option<PathBuf>,
}

#[derive(Clone, Copy, ValueEnum)]
enum AveragingArg {
    Binary,
    Micro,
    Macro,
}

impl From<AveragingArg> for Averaging {
    fn from(arg: AveragingArg) -> Self {
        match arg {
            AveragingArg::Binary => Averaging::default(),
            AveragingArg::Micro => Averaging::Micro,
            AveragingArg::Macro => Averaging::Macro,
        }
    }
}

impl TrainArgs {
    fn resolve(&self) -> RegressionResult<TrainingConfig> {
        let mut config = match &self.config {
            Some(path) => TrainingConfig::from_json(&fs::read_to_string(path)?)?,
            None => TrainingConfig::default(),
        };
        if let Some(degree) = self.degree {
            config.degree = degree;
        }
        if let Some(learning_rate) = self.learning_rate {
            config.learning_rate = learning_rate;
        }
        if let Some(lambda) = self.lambda {
            config.l2_penalty = lambda;
        }
        if let Some(delta) = self.delta {
            config.convergence_delta = delta;
        }
        if let Some(max_iterations) = self.max_iterations {
            config.max_iterations = max_iterations;
        }
        if let Some(threshold) = self.threshold {
            config.classification_threshold = threshold;
        }
        if let Some(link) = self.link {
            config.link_function = link;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
            if let InitStrategy::UniformRandom { seed: init_seed } = &mut config.init {
                init_seed.get_or_insert(seed);
            }
        }
        config.validate()?;
        Ok(config)
    }

    fn penalties(&self, config: &TrainingConfig) -> Vec<f64> {
        match &self.lambda_sweep {
            Some(values) if values.is_empty() => DEFAULT_SWEEP.to_vec(),
            Some(values) => values.clone(),
            None => vec![config.l2_penalty],
        }
    }
}

/// One fit from a fresh theta, traced to cost.dat and summarized in lamda_cost.dat.
fn train<F: ModelFamily>(
    model: &mut RegressionModel<F>,
    x: &Matrix,
    y: &Matrix,
    config: &TrainingConfig,
    l2_penalty: f64,
    output: &Path,
    sweep: &mut PenaltySweepWriter<BufWriter<File>>,
) -> RegressionResult<f64> {
    model.initialize(x.ncols(), y.ncols(), config.init)?;
    let descent = DescentConfig {
        l2_penalty,
        ..config.descent()
    };

    let mut trace = CostTraceWriter::create(output.join(COST_FILE))?;
    let cost = model.fit_with_sink(x, y, descent, &mut trace)?;
    trace.flush()?;
    sweep.record(l2_penalty, cost)?;

    if let Some(report) = model.last_fit() {
        println!(
            "Iterations: {}\nDelta_J(Theta): {:e}\nJ(Theta): {}",
            report.iterations, report.last_delta, report.final_cost
        );
    }
    Ok(cost)
}

fn run_linear(data: &Path, resolution: f64, args: &TrainArgs) -> RegressionResult<()> {
    let config = args.resolve()?;
    let mut dataset = Dataset::from_text_file(data, SplitOptions::from(&config))?;
    dataset.prepare(config.degree, config.pipeline_order)?;
    let x = dataset.train_features()?;
    let y = dataset.y_train();

    fs::create_dir_all(&args.output)?;
    let mut sweep = PenaltySweepWriter::create(args.output.join(LAMBDA_COST_FILE))?;
    let mut model = LinearRegression::linear();
    for l2_penalty in args.penalties(&config) {
        train(&mut model, &x, &y, &config, l2_penalty, &args.output, &mut sweep)?;
        if dataset.n_test() > 0 {
            let test_cost = model.cost(&dataset.test_features()?, &dataset.y_test())?;
            println!("Cost on test set (lambda = {}): {}\n", l2_penalty, test_cost);
        }
    }
    sweep.flush()?;

    let curve = model_curve(&dataset, &model, resolution)?;
    write_curve_file(args.output.join(MODEL_FILE), &curve)?;
    info!("Wrote {} curve points to {}", curve.len(), args.output.join(MODEL_FILE).display());

    if let Some(path) = &args.save_model {
        save_model(&ModelSnapshot::linear(&model, dataset.pipeline())?, path)?;
    }
    Ok(())
}

/// Training targets for the link, plus test features and targets when the
/// split keeps any test rows.
///
/// A sigmoid link takes a two-label column mapped onto 0/1; softmax takes
/// one-hot rows.
fn classification_targets(
    dataset: &Dataset,
    link: LinkFunction,
) -> RegressionResult<(Matrix, Option<(Matrix, Matrix)>)> {
    let targets = |rows_are_train: bool| match (link, rows_are_train) {
        (LinkFunction::Sigmoid, true) => dataset.y_train_binary(),
        (LinkFunction::Sigmoid, false) => dataset.y_test_binary(),
        (LinkFunction::Softmax, true) => dataset.y_train_one_hot(),
        (LinkFunction::Softmax, false) => dataset.y_test_one_hot(),
    };
    let y_train = targets(true)?;
    if dataset.n_test() == 0 {
        return Ok((y_train, None));
    }
    Ok((y_train, Some((dataset.test_features()?, targets(false)?))))
}

fn run_logistic(
    data: Option<&Path>,
    mnist: Option<&Path>,
    averaging: Option<AveragingArg>,
    args: &TrainArgs,
) -> RegressionResult<()> {
    let mut config = args.resolve()?;
    let mut dataset = match (mnist, data) {
        (Some(dir), _) => {
            if args.degree.is_none() && args.config.is_none() {
                info!("Using degree 1 for MNIST pixels");
                config.degree = 1;
            }
            load_mnist(dir)?
        }
        (None, Some(path)) => Dataset::from_text_file(path, SplitOptions::from(&config))?,
        (None, None) => {
            return Err(RegressionError::EmptyInput("no data file or MNIST directory given"))
        }
    };
    dataset.prepare(config.degree, config.pipeline_order)?;

    let link = config.link_function;
    let (y_train, test) = classification_targets(&dataset, link)?;
    let averaging = match (averaging, link) {
        (Some(arg), _) => Averaging::from(arg),
        (None, LinkFunction::Sigmoid) => Averaging::default(),
        (None, LinkFunction::Softmax) => Averaging::Macro,
    };
    let x = dataset.train_features()?;
    if test.is_none() {
        info!("Test split is empty, skipping the classification report");
    }

    fs::create_dir_all(&args.output)?;
    let mut sweep = PenaltySweepWriter::create(args.output.join(LAMBDA_COST_FILE))?;
    let mut model = LogisticRegression::logistic(link);
    model.set_classification_threshold(config.classification_threshold)?;
    for (i, l2_penalty) in args.penalties(&config).into_iter().enumerate() {
        train(&mut model, &x, &y_train, &config, l2_penalty, &args.output, &mut sweep)?;

        if let Some((x_test, y_test)) = &test {
            let prediction = model.predict(x_test)?;
            let confusion = ConfusionMatrix::from_one_hot(&prediction.to_matrix(), y_test)?;
            let report = ClassificationReport::new(confusion, averaging)?;
            println!("\nTest - {} (lambda = {}):\n{}\n", i + 1, l2_penalty, report);
        }
    }
    sweep.flush()?;

    if let Some(path) = &args.save_model {
        save_model(&ModelSnapshot::logistic(&model, dataset.pipeline())?, path)?;
    }
    Ok(())
}

fn main() -> ExitCode {
    Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let result = match &cli.command {
        Commands::Linear {
            data,
            resolution,
            train,
        } => run_linear(data, *resolution, train),
        Commands::Logistic {
            data,
            mnist,
            averaging,
            train,
        } => run_logistic(data.as_deref(), mnist.as_deref(), *averaging, train),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn labelled(labels: &[f64], test_percent: f64) -> Dataset {
        let x = Matrix::from_shape_fn((labels.len(), 1), |(i, _)| i as f64);
        let y = Matrix::from_shape_fn((labels.len(), 1), |(i, _)| labels[i]);
        let options = SplitOptions {
            train_percent: 100.0 - test_percent,
            test_percent,
            seed: Some(1),
        };
        let mut dataset = Dataset::split(x, y, options).unwrap();
        dataset.prepare(1, Default::default()).unwrap();
        dataset
    }

    #[test]
    fn test_sigmoid_targets_are_binary() {
        let dataset = labelled(&[1.0, 2.0, 2.0, 1.0, 2.0, 1.0, 1.0, 2.0, 1.0, 2.0], 20.0);
        let (y_train, test) = classification_targets(&dataset, LinkFunction::Sigmoid).unwrap();
        assert_eq!(y_train.ncols(), 1);
        assert!(y_train.iter().all(|&t| t == 0.0 || t == 1.0));
        let (x_test, y_test) = test.unwrap();
        assert_eq!(x_test.nrows(), 2);
        assert!(y_test.iter().all(|&t| t == 0.0 || t == 1.0));

        let three = labelled(&[0.0, 1.0, 2.0, 0.0, 1.0, 2.0], 0.0);
        assert!(classification_targets(&three, LinkFunction::Sigmoid).is_err());
        let (one_hot, _) = classification_targets(&three, LinkFunction::Softmax).unwrap();
        assert_eq!(one_hot.ncols(), 3);
    }

    #[test]
    fn test_empty_test_split_skips_report() {
        let dataset = labelled(&[0.0, 1.0, 0.0, 1.0], 0.0);
        assert_eq!(dataset.n_test(), 0);
        let (y_train, test) = classification_targets(&dataset, LinkFunction::Sigmoid).unwrap();
        assert_eq!(y_train.nrows(), 4);
        assert!(test.is_none());
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::parse_from([
            "polyreg", "logistic", "chip.dat", "--degree", "2", "--lambda", "0.5", "--link", "softmax",
            "--seed", "3",
        ]);
        let Commands::Logistic { train, data, .. } = cli.command else {
            panic!("expected the logistic subcommand");
        };
        assert_eq!(data, Some(PathBuf::from("chip.dat")));

        let config = train.resolve().unwrap();
        assert_eq!(config.degree, 2);
        assert_eq!(config.l2_penalty, 0.5);
        assert_eq!(config.link_function, LinkFunction::Softmax);
        assert_eq!(config.seed, Some(3));
        assert_eq!(config.learning_rate, TrainingConfig::default().learning_rate);
        assert_eq!(train.penalties(&config), vec![0.5]);
    }

    #[test]
    fn test_lambda_sweep_values() {
        let cli = Cli::parse_from(["polyreg", "linear", "servo.dat", "--lambda-sweep"]);
        let Commands::Linear { train, .. } = cli.command else {
            panic!("expected the linear subcommand");
        };
        let config = train.resolve().unwrap();
        assert_eq!(train.penalties(&config), DEFAULT_SWEEP.to_vec());

        let cli = Cli::parse_from(["polyreg", "linear", "servo.dat", "--lambda-sweep", "0,1.5"]);
        let Commands::Linear { train, .. } = cli.command else {
            panic!("expected the linear subcommand");
        };
        assert_eq!(train.penalties(&config), vec![0.0, 1.5]);
    }

    #[test]
    fn test_invalid_override_is_rejected() {
        let cli = Cli::parse_from(["polyreg", "linear", "servo.dat", "--learning-rate=-1"]);
        let Commands::Linear { train, .. } = cli.command else {
            panic!("expected the linear subcommand");
        };
        assert!(train.resolve().is_err());
    }
}
