use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use mini_rag::{LlmKind, SearchStrategy};

#[derive(Debug, Parser)]
#[command(name = "mini-rag")]
#[command(about = "Answer questions over local documents with retrieval-augmented generation")]
#[command(version)]
pub struct Cli {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Build the index, answer one question and print the answer as JSON
    Ask {
        /// The question to answer
        question: String,
    },

    /// Build the index and serve `POST /query` over HTTP
    Serve {
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        #[arg(long, default_value = "8000")]
        port: u16,
    },
}

/// Options shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct PipelineArgs {
    /// Document to index (.txt, .md or .pdf); repeat for several files
    #[arg(short, long = "file", global = true, default_value = "data/docs.txt")]
    pub files: Vec<PathBuf>,

    /// Treat every non-empty line of each file as its own document
    #[arg(long, global = true)]
    pub per_line: bool,

    /// Chunk size in characters
    #[arg(long, global = true, default_value = "300")]
    pub chunk_size: usize,

    /// Overlap between consecutive chunks in characters
    #[arg(long, global = true, default_value = "50")]
    pub overlap: usize,

    /// Number of chunks put into the prompt
    #[arg(long, global = true, default_value = "3")]
    pub top_k: usize,

    /// Candidate pool size for MMR
    #[arg(long, global = true, default_value = "10")]
    pub fetch_k: usize,

    /// MMR relevance/diversity trade-off in [0, 1]
    #[arg(long, global = true, default_value = "0.5")]
    pub lambda: f32,

    #[arg(long, global = true, value_enum, default_value_t = StrategyArg::Mmr)]
    pub strategy: StrategyArg,

    /// Skip a retrieved chunk that directly follows an already chosen chunk of the same document
    #[arg(long, global = true)]
    pub dedup_adjacent: bool,

    #[arg(long, global = true, value_enum, default_value_t = EmbedderArg::Hashing)]
    pub embedder: EmbedderArg,

    /// Chunks sent to the embedder per batch while building the index
    #[arg(long, global = true, default_value = "16")]
    pub embed_batch_size: usize,

    /// Embedding model (DashScope only)
    #[arg(long, global = true)]
    pub embedding_model: Option<String>,

    /// Embedding vector length; defaults to 256 for hashing, 1024 for DashScope
    #[arg(long, global = true)]
    pub embedding_dimensions: Option<usize>,

    /// LLM backend: "dashscope" or "mock"
    #[arg(long, global = true, default_value = "dashscope")]
    pub llm: LlmKind,

    /// Generation model name
    #[arg(long, global = true, default_value = "qwen-plus")]
    pub model: String,

    #[arg(long, global = true, default_value = "0.7")]
    pub temperature: f32,

    /// Deadline for every embedder and LLM call
    #[arg(long, global = true)]
    pub timeout_secs: Option<u64>,

    /// Also append logs to this file
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StrategyArg {
    /// Plain nearest neighbours
    TopK,
    /// Maximal marginal relevance
    Mmr,
}

impl From<StrategyArg> for SearchStrategy {
    fn from(value: StrategyArg) -> Self {
        match value {
            StrategyArg::TopK => SearchStrategy::TopK,
            StrategyArg::Mmr => SearchStrategy::Mmr,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EmbedderArg {
    /// Offline feature-hashing embedder
    Hashing,
    /// DashScope text-embedding API
    Dashscope,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ask_uses_defaults() {
        let cli = Cli::try_parse_from(["mini-rag", "ask", "What is RAG?"]).unwrap();
        assert!(matches!(cli.command, Command::Ask { ref question } if question == "What is RAG?"));
        assert_eq!(cli.pipeline.files, vec![PathBuf::from("data/docs.txt")]);
        assert_eq!(cli.pipeline.top_k, 3);
        assert_eq!(cli.pipeline.fetch_k, 10);
        assert_eq!(cli.pipeline.strategy, StrategyArg::Mmr);
        assert_eq!(cli.pipeline.llm, LlmKind::DashScope);
        assert!(cli.pipeline.timeout_secs.is_none());
        assert!(!cli.pipeline.per_line);
        assert!(!cli.pipeline.dedup_adjacent);
        assert_eq!(cli.pipeline.embed_batch_size, 16);
        assert!(cli.pipeline.embedding_dimensions.is_none());
    }

    #[test]
    fn embedding_and_loading_options_parse() {
        let cli = Cli::try_parse_from([
            "mini-rag", "ask", "q", "--per-line", "--dedup-adjacent", "--embed-batch-size", "4",
            "--embedding-model", "text-embedding-v2", "--embedding-dimensions", "512",
        ])
        .unwrap();
        assert!(cli.pipeline.per_line);
        assert!(cli.pipeline.dedup_adjacent);
        assert_eq!(cli.pipeline.embed_batch_size, 4);
        assert_eq!(cli.pipeline.embedding_model.as_deref(), Some("text-embedding-v2"));
        assert_eq!(cli.pipeline.embedding_dimensions, Some(512));
    }

    #[test]
    fn global_options_follow_the_subcommand() {
        let cli = Cli::try_parse_from([
            "mini-rag", "serve", "--port", "9000", "--file", "a.txt", "--file", "b.md", "--llm", "mock",
            "--strategy", "top-k", "--embedder", "hashing",
        ])
        .unwrap();
        assert!(matches!(cli.command, Command::Serve { port: 9000, .. }));
        assert_eq!(cli.pipeline.files, vec![PathBuf::from("a.txt"), PathBuf::from("b.md")]);
        assert_eq!(cli.pipeline.llm, LlmKind::Mock);
        assert_eq!(SearchStrategy::from(cli.pipeline.strategy), SearchStrategy::TopK);
    }

    #[test]
    fn unknown_llm_is_rejected() {
        assert!(Cli::try_parse_from(["mini-rag", "--llm", "gpt", "ask", "q"]).is_err());
    }
}
