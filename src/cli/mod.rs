use clap::{Args, Parser, Subcommand};

use crate::features::{Feature, FeatureValue};

#[derive(Parser)]
#[command(
    name = "deeptube",
    about = "Deeptube - Transcribe YouTube audio with Deepgram and persist the results to Supabase",
    version,
    long_about = "Downloads the audio track of a YouTube video, submits it to the Deepgram \
speech-to-text API, and stores the transcription in a Supabase table. Runs either as a one-shot \
command or as an HTTP service."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the HTTP API server
    Serve {
        /// Address to bind (overrides the configured address)
        #[arg(short, long, value_name = "ADDR")]
        bind: Option<String>,
    },

    /// Transcribe a single video and persist the result
    Transcribe {
        /// YouTube URL to transcribe
        #[arg(value_name = "URL")]
        url: String,

        #[command(flatten)]
        features: FeatureArgs,
    },

    /// Show or locate the configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },
}

/// Feature flags for the one-shot transcribe command.
#[derive(Args)]
pub struct FeatureArgs {
    /// Add punctuation and capitalization
    #[arg(long)]
    pub punctuate: bool,

    /// Apply smart formatting to numbers, dates, and currency
    #[arg(long)]
    pub smart_format: bool,

    /// Label speakers in the transcript
    #[arg(long)]
    pub diarize: bool,

    /// Split the transcript into paragraphs
    #[arg(long)]
    pub paragraphs: bool,

    /// Return utterance segments
    #[arg(long)]
    pub utterances: bool,

    /// Summarize the transcript
    #[arg(long)]
    pub summarize: bool,

    /// Language code (vendor auto-detects if not specified)
    #[arg(short, long, value_name = "LANG")]
    pub language: Option<String>,
}

impl FeatureArgs {
    /// Feature list equivalent of the enabled flags.
    pub fn to_features(&self) -> Vec<Feature> {
        let mut features = Vec::new();

        for (name, enabled) in [
            ("punctuate", self.punctuate),
            ("smart_format", self.smart_format),
            ("diarize", self.diarize),
            ("paragraphs", self.paragraphs),
            ("utterances", self.utterances),
            ("summarize", self.summarize),
        ] {
            if enabled {
                features.push(Feature {
                    name: name.to_string(),
                    value: FeatureValue::Bool(true),
                });
            }
        }

        if let Some(language) = &self.language {
            features.push(Feature {
                name: "language".to_string(),
                value: FeatureValue::Text(language.clone()),
            });
        }

        features
    }
}
