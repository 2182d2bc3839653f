use facet::Facet;
use facet_args as args;

/// Benchmark a GEMM shape log and generate kernel tuning configs.
#[derive(Facet, Debug)]
pub struct Args {
    /// Path to the GEMM library checkout holding the benchmark and tuning tools
    #[facet(args::positional)]
    pub toolkit_path: String,

    /// GEMM YAML list file
    #[facet(args::positional)]
    pub gemm_log: String,

    /// Which device to run the benchmark on
    #[facet(args::named, args::short = 'd', default = 0)]
    pub device: u32,

    /// Filter threshold on GEMM contribution, in percent of total time
    #[facet(args::named, default = 0.1)]
    pub thr: f64,

    /// Target architecture
    #[facet(args::named, args::short = 'a', default = default_architecture())]
    pub architecture: String,

    /// Dir to store intermediate files
    #[facet(args::named, args::short = 'w', default = default_workdir())]
    pub workdir: String,

    /// Dir holding config_<architecture>.yaml (defaults to the executable's dir)
    #[facet(args::named, default)]
    pub templates: Option<String>,

    /// Benchmark executable (defaults to the one built inside the toolkit)
    #[facet(args::named, default)]
    pub bench_bin: Option<String>,

    /// Tuning driver executable (defaults to the one inside the toolkit)
    #[facet(args::named, default)]
    pub driver: Option<String>,

    /// Write tuning configs without running the tuning driver
    #[facet(args::named)]
    pub no_tune: bool,
}

fn default_architecture() -> String {
    "gfx950".to_string()
}

fn default_workdir() -> String {
    "workdir".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use facet_testhelpers::test;

    #[test]
    fn test_defaults() {
        let args: Args = facet_args::from_slice(&["/opt/hipblaslt", "gemms.yaml"]).unwrap();
        assert_eq!(args.toolkit_path, "/opt/hipblaslt");
        assert_eq!(args.gemm_log, "gemms.yaml");
        assert_eq!(args.device, 0);
        assert_eq!(args.thr, 0.1);
        assert_eq!(args.architecture, "gfx950");
        assert_eq!(args.workdir, "workdir");
        assert!(args.templates.is_none());
        assert!(!args.no_tune);
    }

    #[test]
    fn test_overrides() {
        let args: Args = facet_args::from_slice(&[
            "-d",
            "3",
            "--thr",
            "2.5",
            "-a",
            "gfx942",
            "-w",
            "out",
            "--bench-bin",
            "/usr/bin/true",
            "--no-tune",
            "/opt/hipblaslt",
            "gemms.yaml",
        ])
        .unwrap();
        assert_eq!(args.device, 3);
        assert_eq!(args.thr, 2.5);
        assert_eq!(args.architecture, "gfx942");
        assert_eq!(args.workdir, "out");
        assert_eq!(args.bench_bin.as_deref(), Some("/usr/bin/true"));
        assert!(args.no_tune);
    }
}
