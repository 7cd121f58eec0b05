use crate::errors::VeilResult;

/// Host and port of a networked cache backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEndpoint {
    pub host: String,
    pub port: u16,
}

/// Turns a managed cache instance id + region into a reachable endpoint.
///
/// `create_if_missing` is forwarded from config. Whether the resolver honors it
/// (and how) is its own business; the mapping store never provisions anything.
pub trait IEndpointResolver: Send + Sync {
    fn resolve(
        &self,
        instance_id: &str,
        region: &str,
        create_if_missing: bool,
    ) -> VeilResult<CacheEndpoint>;
}
