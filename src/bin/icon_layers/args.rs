use clap::Parser;

#[derive(Debug, Parser)]
#[clap(version, about, long_about = None)]
pub struct Opt {
    /// Input image file.
    #[clap(short, long)]
    pub input: std::path::PathBuf,

    /// Output directory for the extracted layer images, defaults to the
    /// input file's directory.
    #[clap(short, long)]
    pub output_dir: Option<std::path::PathBuf>,

    /// Target number of superpixel segments.
    #[clap(short = 'n', long = "superpixels", default_value_t = 1_000)]
    pub superpixels: u32,

    /// SLIC compactness. Range of 1 to 20.
    #[clap(short = 'c', long, default_value_t = 25.0)]
    pub compactness: f64,

    /// Number of SLIC iterations to run.
    #[clap(long, default_value_t = 10)]
    pub iter: u32,

    /// Target number of color clusters.
    #[clap(short = 'k', long, default_value_t = 8)]
    pub clusters: u32,

    /// Cluster-merge distance threshold; clusters closer than this are
    /// combined.
    #[clap(long, default_value_t = 30.0)]
    pub merge_threshold: f64,

    /// Cluster-merge strategy used.
    #[clap(long, default_value = "simple")]
    pub merge_strategy: crate::utils::MergeStrategyArg,

    /// Seed for the deterministic clustering PRNG.
    #[clap(long, default_value_t = 8_675_309)]
    pub seed: u64,

    /// Print per-layer pixel counts and timing.
    #[clap(short, long)]
    pub verbose: bool,

    /// Save as a JPG or PNG file.
    #[clap(long, default_value = "png")]
    pub format: String,
}
