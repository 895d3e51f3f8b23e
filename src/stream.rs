use std::time::Duration;

use alloy::{
    providers::Provider,
    rpc::types::{Filter, Log},
};
use futures::{Stream, StreamExt, stream};

use crate::error::RemoteError;

/// Returns stream of logs matching the filter, starting from the specified
/// block and following the tip of the chain.
///
/// Polls logs one block at a time via the given [`Provider`] to produce
/// strictly continuous log sequence in block and log index order, sleeping
/// for `poll_interval` while the chain head is behind the next block.
///
/// The stream ends after the filter's `to_block`, if it is a number.
/// Errors reported by the node, invalid requests included, are yielded as
/// they are and the failed block is retried on the next poll.
pub fn logs<P, S, SFut>(
    provider: P,
    filter: Filter,
    from_block: u64,
    poll_interval: Duration,
    sleep: S,
) -> impl Stream<Item = Result<Log, RemoteError>>
where
    P: Provider,
    S: Fn(Duration) -> SFut + Copy,
    SFut: Future<Output = ()>,
{
    let to_block = filter.get_to_block();
    stream::unfold(
        (provider, filter, from_block),
        move |(provider, filter, mut block_num)| async move {
            if to_block.is_some_and(|to| block_num > to) {
                return None;
            }
            let block_filter = filter.clone().from_block(block_num).to_block(block_num);
            loop {
                // Anvil node, and maybe some RPC providers, produce empty response instead of
                // error in case the block in the filter does not exist yet,
                // so the tip of the chain is checked first
                let head_block_num = match provider.get_block_number().await {
                    Ok(head_block_num) => head_block_num,
                    Err(err) => {
                        let batch = vec![Err(RemoteError::from(err))];
                        return Some((batch, (provider, filter, block_num)));
                    }
                };
                if head_block_num < block_num {
                    sleep(poll_interval).await;
                    continue;
                }
                return match provider.get_logs(&block_filter).await {
                    Ok(logs) => {
                        block_num += 1;
                        let batch = logs.into_iter().map(Ok).collect::<Vec<_>>();
                        Some((batch, (provider, filter, block_num)))
                    }
                    Err(err) => {
                        let batch = vec![Err(RemoteError::from(err))];
                        Some((batch, (provider, filter, block_num)))
                    }
                };
            }
        },
    )
    .flat_map(stream::iter)
}
