//! Output seam for joined tuples.

use crate::error::{JoinError, JoinResult};
use crate::types::JoinedTuple;
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Downstream consumer of joined tuples. Implementations may block; the
/// pipeline wraps every call in a deadline and treats sink failures as
/// fatal for the run. No retries happen at this layer.
#[async_trait]
pub trait Emitter: Send {
    async fn emit(&mut self, tuple: &JoinedTuple) -> JoinResult<()>;

    /// Flush buffered output. Called after the last tuple of a bucket.
    async fn flush(&mut self) -> JoinResult<()> {
        Ok(())
    }
}

/// Render one tuple as a tab-separated line with comma-joined cells:
/// `join_key \t left1,...,leftN \t right1,...,rightM`. Null cells from
/// outer joins render empty.
pub fn render_line(tuple: &JoinedTuple) -> String {
    let cells = |side: &[Option<String>]| {
        side.iter()
            .map(|f| f.as_deref().unwrap_or(""))
            .collect::<Vec<_>>()
            .join(",")
    };
    format!(
        "{}\t{}\t{}",
        tuple.join_key,
        cells(&tuple.left),
        cells(&tuple.right)
    )
}

/// Writes tuples to an async byte sink, one line per tuple with standard
/// single-newline termination.
pub struct WriterEmitter<W> {
    writer: W,
}

impl<W: AsyncWrite + Unpin + Send> WriterEmitter<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

#[async_trait]
impl<W: AsyncWrite + Unpin + Send> Emitter for WriterEmitter<W> {
    async fn emit(&mut self, tuple: &JoinedTuple) -> JoinResult<()> {
        let line = render_line(tuple);
        self.writer
            .write_all(line.as_bytes())
            .await
            .map_err(sink_error)?;
        self.writer.write_all(b"\n").await.map_err(sink_error)?;
        Ok(())
    }

    async fn flush(&mut self) -> JoinResult<()> {
        self.writer.flush().await.map_err(sink_error)
    }
}

fn sink_error(e: std::io::Error) -> JoinError {
    JoinError::Sink {
        reason: "downstream write failed".to_string(),
        source: Some(Box::new(e)),
    }
}

/// Collects tuples in memory. Test double for pipeline assertions.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    pub tuples: Vec<JoinedTuple>,
}

#[async_trait]
impl Emitter for CollectingEmitter {
    async fn emit(&mut self, tuple: &JoinedTuple) -> JoinResult<()> {
        self.tuples.push(tuple.clone());
        Ok(())
    }
}

/// Run one emit call under the configured deadline. Expiry surfaces as
/// [`JoinError::EmitTimeout`]; the caller decides nothing further, the
/// error is fatal.
pub async fn emit_with_deadline<E: Emitter + ?Sized>(
    emitter: &mut E,
    tuple: &JoinedTuple,
    deadline: Duration,
) -> JoinResult<()> {
    match tokio::time::timeout(deadline, emitter.emit(tuple)).await {
        Ok(result) => result,
        Err(_) => Err(JoinError::EmitTimeout { deadline }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuple(key: &str, left: &[Option<&str>], right: &[Option<&str>]) -> JoinedTuple {
        let cells = |side: &[Option<&str>]| {
            side.iter()
                .map(|f| f.map(|s| s.to_string()))
                .collect::<Vec<_>>()
        };
        JoinedTuple {
            join_key: key.to_string(),
            left: cells(left),
            right: cells(right),
        }
    }

    #[test]
    fn test_render_line_basic() {
        let t = tuple(
            "Alice",
            &[Some("Great Book")],
            &[Some("5"), Some("4"), Some("3")],
        );
        assert_eq!(render_line(&t), "Alice\tGreat Book\t5,4,3");
    }

    #[test]
    fn test_render_line_null_cells_are_empty() {
        let t = tuple("k", &[Some("d")], &[None, None]);
        assert_eq!(render_line(&t), "k\td\t,");
    }

    #[test]
    fn test_collecting_emitter_records_in_order() {
        let mut emitter = CollectingEmitter::default();
        tokio_test::block_on(emitter.emit(&tuple("a", &[Some("1")], &[Some("2")]))).unwrap();
        tokio_test::block_on(emitter.emit(&tuple("b", &[Some("3")], &[Some("4")]))).unwrap();
        let keys: Vec<&str> = emitter.tuples.iter().map(|t| t.join_key.as_str()).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_writer_emitter_terminates_lines_once() {
        let mut buffer = Vec::new();
        {
            let mut emitter = WriterEmitter::new(&mut buffer);
            emitter
                .emit(&tuple("a", &[Some("1")], &[Some("2")]))
                .await
                .unwrap();
            emitter
                .emit(&tuple("b", &[Some("3")], &[Some("4")]))
                .await
                .unwrap();
            emitter.flush().await.unwrap();
        }
        assert_eq!(String::from_utf8(buffer).unwrap(), "a\t1\t2\nb\t3\t4\n");
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_deadline_expiry_surfaces_timeout() {
        struct StallingEmitter;

        #[async_trait]
        impl Emitter for StallingEmitter {
            async fn emit(&mut self, _tuple: &JoinedTuple) -> JoinResult<()> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(())
            }
        }

        let mut emitter = StallingEmitter;
        let err = emit_with_deadline(
            &mut emitter,
            &tuple("k", &[], &[]),
            Duration::from_millis(50),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, JoinError::EmitTimeout { .. }));
    }
}
