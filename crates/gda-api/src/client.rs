use std::sync::Arc;

use gda_store::{BlobStore, HandleResolver, ObjectStore};
use tracing::debug;

use crate::annotation::GenomeAnnotation;
use crate::assembly::Assembly;
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::object::ObjectHandle;
use crate::taxon::Taxon;

/// The stores and settings every handle and adapter reads through.
///
/// Cloning is cheap; all clones share the same backends.
#[derive(Clone)]
pub struct Services {
    objects: Arc<dyn ObjectStore>,
    blobs: Arc<dyn BlobStore>,
    handles: Option<Arc<dyn HandleResolver>>,
    config: ApiConfig,
}

impl Services {
    pub fn new(objects: Arc<dyn ObjectStore>, blobs: Arc<dyn BlobStore>) -> Self {
        Self {
            objects,
            blobs,
            handles: None,
            config: ApiConfig::default(),
        }
    }

    pub fn with_handle_resolver(mut self, handles: Arc<dyn HandleResolver>) -> Self {
        self.handles = Some(handles);
        self
    }

    pub fn with_config(mut self, config: ApiConfig) -> Self {
        self.config = config;
        self
    }

    pub fn objects(&self) -> &dyn ObjectStore {
        self.objects.as_ref()
    }

    pub fn blobs(&self) -> &dyn BlobStore {
        self.blobs.as_ref()
    }

    pub fn handle_resolver(&self) -> Option<&dyn HandleResolver> {
        self.handles.as_deref()
    }

    pub fn config(&self) -> &ApiConfig {
        &self.config
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Services")
            .field("handle_resolver", &self.handles.is_some())
            .field("config", &self.config)
            .finish()
    }
}

/// Entry point: opens references as raw handles or typed adapters.
#[derive(Clone, Debug)]
pub struct DataApi {
    services: Services,
}

impl DataApi {
    pub fn new(services: Services) -> ApiResult<Self> {
        services.config().validate()?;
        debug!(config = ?services.config(), "data api ready");
        Ok(Self { services })
    }

    pub fn services(&self) -> &Services {
        &self.services
    }

    /// Resolve `reference` and wrap it in an untyped handle.
    pub fn object(&self, reference: &str) -> ApiResult<ObjectHandle> {
        ObjectHandle::open(&self.services, reference)
    }

    pub fn genome_annotation(&self, reference: &str) -> ApiResult<GenomeAnnotation> {
        GenomeAnnotation::open(&self.services, reference)
    }

    pub fn assembly(&self, reference: &str) -> ApiResult<Assembly> {
        Assembly::open(&self.services, reference)
    }

    pub fn taxon(&self, reference: &str) -> ApiResult<Taxon> {
        Taxon::open(&self.services, reference)
    }
}
