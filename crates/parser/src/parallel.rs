//! # Parallel Parsing
//!
//! Parses many sentences at once on the core [`TaskPool`]. Each sentence is
//! one task; the pool bounds concurrency with the configured number of
//! workers and applies the configured per-sentence deadline. A sentence
//! that misses the deadline comes back as [`TaskOutcome::TimedOut`] and the
//! parser abandons its chart at the next span.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use semparse_ccg::lexicon::{tokenize, Lexicon};
//! use semparse_ccg::CategoryServices;
//! use semparse_logic::LogicContext;
//! use semparse_parser::{CkyParser, ParallelParser};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let services = CategoryServices::new(Arc::new(LogicContext::builder().build().unwrap()));
//! let parser = CkyParser::builder(services, Arc::new(Lexicon::new())).build().unwrap();
//! let parallel = ParallelParser::new(Arc::new(parser));
//! let outcomes = parallel.parse_all(vec![tokenize("big city"), tokenize("small town")]).await;
//! assert_eq!(outcomes.len(), 2);
//! # }
//! ```

use std::sync::Arc;

use semparse_core::{CancelFlag, Task, TaskOutcome, TaskPool};

use crate::cky::CkyParser;
use crate::output::ParserOutput;
use crate::ParseError;

/// One sentence through a shared parser.
#[derive(Debug, Clone)]
pub struct ParseTask {
    parser: Arc<CkyParser>,
}

impl Task for ParseTask {
    type Input = Vec<String>;
    type Output = Result<ParserOutput, ParseError>;

    fn run(&self, tokens: Vec<String>, cancel: &CancelFlag) -> Self::Output {
        self.parser.parse_with_cancel(&tokens, cancel)
    }
}

pub type ParseOutcome = TaskOutcome<Result<ParserOutput, ParseError>>;

#[derive(Debug, Clone)]
pub struct ParallelParser {
    pool: TaskPool<ParseTask>,
}

impl ParallelParser {
    /// Pool size and deadline come from the parser's configuration.
    pub fn new(parser: Arc<CkyParser>) -> Self {
        let workers = parser.config().workers;
        let timeout = parser.config().timeout();
        let mut pool = TaskPool::new(ParseTask { parser });
        if let Some(workers) = workers {
            pool = pool.with_workers(workers);
        }
        if let Some(timeout) = timeout {
            pool = pool.with_timeout(timeout);
        }
        tracing::info!(workers = pool.workers(), timeout = ?timeout, "parallel parser");
        Self { pool }
    }

    pub fn parser(&self) -> &CkyParser {
        &self.pool.task().parser
    }

    /// Parse every sentence; outcomes come back in input order.
    pub async fn parse_all(&self, sentences: Vec<Vec<String>>) -> Vec<ParseOutcome> {
        self.pool.run_all(sentences).await
    }

    pub async fn parse(&self, tokens: Vec<String>) -> ParseOutcome {
        self.pool.run_one(tokens).await
    }
}
