//! Command line of the `tellopad-track` binary.
//!
//! The binary needs both network files; anything short of that prints
//! [`TRACK_USAGE`] and exits before a pipe or a model is opened.

use clap::error::ErrorKind;
use clap::Parser;
use std::ffi::OsString;
use std::path::PathBuf;

pub const TRACK_USAGE: &str = "How to run:\ntellopad-track [protofile] [modelfile]";

#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "tellopad-track", version, about = "Fly a Tello with a gamepad and track faces")]
pub struct TrackArgs {
    /// Network topology (ONNX graph)
    pub protofile: PathBuf,

    /// Network weights, stored beside the graph
    pub modelfile: PathBuf,

    /// Ignored
    #[arg(hide = true, trailing_var_arg = true, allow_hyphen_values = true)]
    pub extra: Vec<String>,
}

/// What the binary should do with its command line.
#[derive(Debug)]
pub enum TrackInvocation {
    Run(TrackArgs),
    /// Print [`TRACK_USAGE`] and exit
    Usage,
    /// `--help` or `--version` output to print
    Info(clap::Error),
}

pub fn parse_track_args<I, T>(args: I) -> TrackInvocation
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    match TrackArgs::try_parse_from(args) {
        Ok(args) => TrackInvocation::Run(args),
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => {
            TrackInvocation::Info(e)
        }
        Err(_) => TrackInvocation::Usage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_arguments_print_usage() {
        assert!(matches!(parse_track_args(["tellopad-track"]), TrackInvocation::Usage));
        assert!(matches!(
            parse_track_args(["tellopad-track", "face.onnx"]),
            TrackInvocation::Usage
        ));
    }

    #[test]
    fn test_both_files_run() {
        let TrackInvocation::Run(args) = parse_track_args(["tellopad-track", "face.onnx", "face.onnx.data"]) else {
            panic!("expected Run");
        };
        assert_eq!(args.protofile, PathBuf::from("face.onnx"));
        assert_eq!(args.modelfile, PathBuf::from("face.onnx.data"));
        assert!(args.extra.is_empty());
    }

    #[test]
    fn test_extra_arguments_are_ignored() {
        let TrackInvocation::Run(args) =
            parse_track_args(["tellopad-track", "face.onnx", "face.onnx.data", "unused", "-x"])
        else {
            panic!("expected Run");
        };
        assert_eq!(args.modelfile, PathBuf::from("face.onnx.data"));
        assert_eq!(args.extra, vec!["unused", "-x"]);
    }

    #[test]
    fn test_help_is_not_usage() {
        assert!(matches!(
            parse_track_args(["tellopad-track", "--help"]),
            TrackInvocation::Info(_)
        ));
    }
}
