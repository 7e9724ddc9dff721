use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "manta",
    version,
    about = "A multi-pane cluster-operations workspace for Kubernetes contexts."
)]
pub struct CliArgs {
    /// Path to a kubeconfig file (defaults to the standard discovery chain)
    #[arg(long)]
    pub kubeconfig: Option<String>,

    /// Shell to launch in terminal sessions (defaults to $SHELL, then /bin/sh)
    #[arg(long)]
    pub shell: Option<String>,

    /// Maximum number of tab activations remembered for re-activation
    #[arg(long)]
    pub history_limit: Option<usize>,

    /// Detail view refresh interval in milliseconds
    #[arg(long, default_value_t = 2_000)]
    pub refresh_ms: u64,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,
}
