use actix_web::{body::MessageBody, dev::{ServiceRequest, ServiceResponse}, middleware::Next, Error};
use tracing::{debug, warn};

/**
 * Middleware for timing requests. Responses with a server error status are logged as warnings.
 */
pub async fn timing_middleware(
    request: ServiceRequest,
    next: Next<impl MessageBody>,
) -> Result<ServiceResponse<impl MessageBody>, Error> {
    let start_time = std::time::Instant::now();
    let path = request.path().to_owned();
    let method = request.method().to_owned();
    let response = next.call(request).await;
    let response_code = match &response {
        Ok(service_response) => service_response.status().as_u16(),
        Err(err) => err.as_response_error().status_code().as_u16(),
    };
    let duration = start_time.elapsed();
    if response_code >= 500 {
        warn!(target: "performance", "Request for {} {} failed with status {} after {}ms", method, path, response_code, duration.as_millis());
    } else {
        debug!(target: "performance", "Request for {} {} with status {} processed in {}ms", method, path, response_code, duration.as_millis());
    }
    response
}
