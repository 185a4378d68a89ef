use chainstore_history_core::BlockLevel;
use chainstored::client::{Client, ClientError, COMMAND_FAILED_PREFIX};
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(10);
const SYNC_TIMEOUT: Duration = Duration::from_secs(30);

/// Bounded polling. Node readiness/synchronization is the only thing the
/// harness ever retries; command failures always surface immediately.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if predicate() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        std::thread::sleep(POLL_INTERVAL);
    }
}

/// Waits until the node behind `client` reports the expected head level
pub fn check_level(client: &Client, expected: BlockLevel) -> bool {
    wait_until(SYNC_TIMEOUT, || matches!(client.get_head(), Ok((_, level)) if level == expected))
}

/// Asserts that both the block and its metadata are served at `level`
pub fn assert_block_available(client: &Client, level: BlockLevel) {
    let block = client.get_block_at_level(level).unwrap_or_else(|err| panic!("expected block at level {level}: {err}"));
    assert_eq!(block.level(), level);
    let metadata = client.get_block_metadata_at_level(level).unwrap_or_else(|err| panic!("expected metadata at level {level}: {err}"));
    assert_eq!(metadata.level, level);
    assert_eq!(metadata.hash, block.hash());
}

/// Asserts that the metadata query at `level` fails the way pruning makes
/// it fail: a command failure whose text starts with the well-known
/// not-found prefix. Anything else (e.g. a dead node) is a harness error.
pub fn assert_metadata_unavailable(client: &Client, level: BlockLevel) {
    match client.get_block_metadata_at_level(level) {
        Ok(_) => panic!("metadata at level {level} should have been pruned"),
        Err(err @ ClientError::CommandFailed(_)) => {
            let rendered = err.to_string();
            assert!(rendered.starts_with(COMMAND_FAILED_PREFIX), "unexpected failure shape: {rendered}");
            assert!(rendered.starts_with(super::EXPECTED_COMMAND_ERROR), "unexpected failure text: {rendered}");
        }
        Err(other) => panic!("environment failure while querying level {level}: {other}"),
    }
}

/// Asserts that the block query at `level` fails with the not-found error
pub fn assert_block_unavailable(client: &Client, level: BlockLevel) {
    match client.get_block_at_level(level) {
        Ok(_) => panic!("block at level {level} should have been pruned"),
        Err(err @ ClientError::CommandFailed(_)) => {
            assert!(err.to_string().starts_with(super::EXPECTED_COMMAND_ERROR), "unexpected failure text: {err}");
        }
        Err(other) => panic!("environment failure while querying level {level}: {other}"),
    }
}
