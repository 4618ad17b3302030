//! Athena Cluster - turns a raw chat history into topic clusters.
//!
//! - **filter**: engagement threshold with a generous top-N fallback
//! - **lexical**: batch-relative TF-IDF weights, composite and IQR scoring
//! - **stopwords**: the English stop-word list used by lexical weighting
//! - **fuser**: embeddings plus a normalized time feature
//! - **hdbscan**: density clustering with leaf/EOM selection
//! - **density**: noise removal and representative selection
//! - **pipeline**: [`ClusterPipeline`], the entry point
//!
//! ```no_run
//! # async fn example(messages: Vec<athena_core::ChatMessage>) -> athena_cluster::Result<()> {
//! use athena_cluster::{ClusterPipeline, ProcessorConfig};
//!
//! let pipeline = ClusterPipeline::new(athena_llm::create_provider(), ProcessorConfig::default())?;
//! for (i, cluster) in pipeline.run(&messages).await?.iter().enumerate() {
//!     println!("cluster {i}: {} representatives", cluster.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod density;
pub mod error;
pub mod filter;
pub mod fuser;
pub mod hdbscan;
pub mod lexical;
pub mod matrix;
pub mod pipeline;
pub mod stopwords;

pub use config::ProcessorConfig;
pub use density::DensityClusterer;
pub use error::{ClusterError, Result};
pub use filter::MessageFilter;
pub use fuser::EmbeddingFuser;
pub use hdbscan::{ClusterSelectionMethod, Hdbscan, HdbscanParams, NOISE};
pub use lexical::{composite_scores, iqr_threshold, LexicalWeighter, TfidfSettings};
pub use matrix::FeatureMatrix;
pub use pipeline::ClusterPipeline;
