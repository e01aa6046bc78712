//! Result wrapping for backend calls.
//!
//! Every call goes through [`run_query`]: the caller always gets an
//! [`OperationResult`], whatever the call did.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;

use futures::FutureExt;

use crate::domain::{OperationError, OperationResult, UnexpectedError};
use crate::supabase::ClientError;

/// Run a deferred backend call and normalize its outcome.
///
/// Backend-reported errors come back as [`OperationError::Backend`];
/// transport faults, decode faults and panics as
/// [`OperationError::Unexpected`]. All of them are logged.
pub async fn run_query<T, F, Fut>(thunk: F) -> OperationResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    // Building the future can panic too, so both steps run under catch_unwind.
    let outcome = AssertUnwindSafe(async move { thunk().await })
        .catch_unwind()
        .await;

    match outcome {
        Ok(Ok(payload)) => Ok(payload),
        Ok(Err(ClientError::Api(e))) => {
            tracing::error!("Backend query error: {:?}", e);
            Err(OperationError::Backend(e))
        }
        Ok(Err(e)) => {
            tracing::error!("Unexpected error during backend query: {}", e);
            Err(OperationError::Unexpected(UnexpectedError::new(e.to_string())))
        }
        Err(panic) => {
            let message = panic_message(panic.as_ref());
            tracing::error!("Backend query panicked: {}", message);
            Err(OperationError::Unexpected(UnexpectedError::from_panic(message)))
        }
    }
}

/// A call expected to yield one row.
pub async fn fetch_single<T, F, Fut>(thunk: F) -> OperationResult<T>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<T, ClientError>>,
{
    run_query(thunk).await
}

/// A call expected to yield many rows.
pub async fn fetch_many<T, F, Fut>(thunk: F) -> OperationResult<Vec<T>>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<T>, ClientError>>,
{
    run_query(thunk).await
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "Unknown error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::supabase::BackendError;

    #[tokio::test]
    async fn test_success_carries_payload() {
        let result = run_query(|| async { Ok::<_, ClientError>(vec![1, 2, 3]) }).await;
        assert_eq!(result.unwrap(), vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_backend_error_is_returned_not_thrown() {
        let result: OperationResult<()> = run_query(|| async {
            Err(ClientError::Api(
                BackendError::new("permission denied for table services").with_status(401),
            ))
        })
        .await;

        match result {
            Err(OperationError::Backend(e)) => {
                assert_eq!(e.message, "permission denied for table services");
                assert_eq!(e.status, Some(401));
            }
            other => panic!("expected backend error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_decode_fault_is_unexpected() {
        let result: OperationResult<()> =
            run_query(|| async { Err(ClientError::Decode("expected value".to_string())) }).await;

        match result {
            Err(OperationError::Unexpected(e)) => assert!(!e.is_panic()),
            other => panic!("expected unexpected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_inside_call_is_captured() {
        let result: OperationResult<u32> = run_query(|| async {
            if true {
                panic!("connection reset");
            }
            Ok(1)
        })
        .await;

        match result {
            Err(OperationError::Unexpected(e)) => {
                assert_eq!(e.message(), "connection reset");
                assert!(e.is_panic());
            }
            other => panic!("expected unexpected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_panic_while_building_call_is_captured() {
        let result: OperationResult<u32> = run_query(|| -> std::future::Ready<Result<u32, ClientError>> {
            panic!("{}", String::from("bad thunk"))
        })
        .await;

        match result {
            Err(OperationError::Unexpected(e)) => assert_eq!(e.message(), "bad thunk"),
            other => panic!("expected unexpected error, got {:?}", other),
        }
    }
}
