//! CLI argument definitions using clap derive macros.

use std::path::PathBuf;

use clap::Parser;
use update_downloader::file_name_from_url;
use url::Url;

/// File name used when neither the server nor the URL offers one.
pub const FALLBACK_FILE_NAME: &str = "download.bin";

/// Fetch one update package with live progress.
///
/// Resolves the name the package will be saved under, downloads it, and
/// exits non-zero if the download fails or is interrupted.
#[derive(Parser, Debug)]
#[command(name = "update-fetch")]
#[command(author, version, about)]
pub struct Args {
    /// Package URL to download
    pub url: String,

    /// Destination file (defaults to the resolved file name in the current directory)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// JSON session configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Skip the HEAD preflight that discovers the destination file name
    #[arg(long)]
    pub no_resolve: bool,

    /// Increase output verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(short, long)]
    pub quiet: bool,
}

impl Args {
    /// Picks the destination: `--output` wins, then the resolved name, then
    /// the last segment of the source URL, then [`FALLBACK_FILE_NAME`].
    pub fn destination(&self, source: &Url, resolved_name: Option<&str>) -> PathBuf {
        if let Some(output) = &self.output {
            return output.clone();
        }
        let name = resolved_name
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| file_name_from_url(source))
            .unwrap_or_else(|| FALLBACK_FILE_NAME.to_string());
        PathBuf::from(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(raw: &str) -> Url {
        Url::parse(raw).unwrap()
    }

    #[test]
    fn test_cli_url_is_required() {
        let result = Args::try_parse_from(["update-fetch"]);
        let err = result.unwrap_err();
        assert_eq!(
            err.kind(),
            clap::error::ErrorKind::MissingRequiredArgument
        );
    }

    #[test]
    fn test_cli_default_args_parses_successfully() {
        let args = Args::try_parse_from(["update-fetch", "https://cdn.test/app.zip"]).unwrap();
        assert_eq!(args.url, "https://cdn.test/app.zip");
        assert_eq!(args.verbose, 0);
        assert!(!args.quiet);
        assert!(!args.no_resolve);
        assert!(args.output.is_none());
        assert!(args.config.is_none());
    }

    #[test]
    fn test_cli_verbose_flag_increments_count() {
        let args = Args::try_parse_from(["update-fetch", "-v", "https://cdn.test/a"]).unwrap();
        assert_eq!(args.verbose, 1);

        let args = Args::try_parse_from(["update-fetch", "-vv", "https://cdn.test/a"]).unwrap();
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn test_cli_quiet_flag_sets_quiet() {
        let args = Args::try_parse_from(["update-fetch", "-q", "https://cdn.test/a"]).unwrap();
        assert!(args.quiet);

        let args = Args::try_parse_from(["update-fetch", "--quiet", "https://cdn.test/a"]).unwrap();
        assert!(args.quiet);
    }

    #[test]
    fn test_cli_output_and_config_flags() {
        let args = Args::try_parse_from([
            "update-fetch",
            "-o",
            "/tmp/pkg.zip",
            "--config",
            "session.json",
            "--no-resolve",
            "https://cdn.test/a",
        ])
        .unwrap();
        assert_eq!(args.output, Some(PathBuf::from("/tmp/pkg.zip")));
        assert_eq!(args.config, Some(PathBuf::from("session.json")));
        assert!(args.no_resolve);
    }

    #[test]
    fn test_cli_help_flag_shows_usage() {
        // --help causes early exit, so we check it returns an error with Help kind
        let err = Args::try_parse_from(["update-fetch", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn test_cli_invalid_flag_returns_error() {
        let err = Args::try_parse_from(["update-fetch", "--invalid-flag", "https://cdn.test/a"])
            .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_destination_prefers_explicit_output() {
        let args =
            Args::try_parse_from(["update-fetch", "-o", "out.zip", "https://cdn.test/a"]).unwrap();
        let source = url("https://cdn.test/latest");
        assert_eq!(
            args.destination(&source, Some("app-2.0.zip")),
            PathBuf::from("out.zip")
        );
    }

    #[test]
    fn test_destination_uses_resolved_name_then_url_segment() {
        let args = Args::try_parse_from(["update-fetch", "https://cdn.test/latest"]).unwrap();
        let source = url("https://cdn.test/releases/My%20App.msi");
        assert_eq!(
            args.destination(&source, Some("app-2.0.zip")),
            PathBuf::from("app-2.0.zip")
        );
        assert_eq!(args.destination(&source, None), PathBuf::from("My App.msi"));
    }

    #[test]
    fn test_destination_falls_back_when_url_has_no_name() {
        let args = Args::try_parse_from(["update-fetch", "https://cdn.test/"]).unwrap();
        let source = url("https://cdn.test/");
        assert_eq!(
            args.destination(&source, None),
            PathBuf::from(FALLBACK_FILE_NAME)
        );
    }
}
