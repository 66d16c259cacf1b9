//! Built-in features.
//!
//! Registration order is significant: it is the order in which every
//! lifecycle event reaches the features, and the order their finishers run.

mod assets;
mod decorators;
mod events;
mod inject;
mod js;
mod lazy;
mod redirects;

pub use assets::SupportScriptsAndAssets;
pub use decorators::SupportDecorators;
pub use events::SupportEvents;
pub use inject::finish_response;
pub use js::SupportJsEvaluation;
pub use lazy::{SupportLazyLoading, FOR_MOUNT_MEMO};
pub use redirects::SupportRedirects;

use crate::hooks::{ComponentHook, FeatureFactory};

/// Default constructor for any feature with a `Default` impl.
pub fn feature<T: ComponentHook + Default + 'static>() -> Box<dyn ComponentHook> {
    Box::new(T::default())
}

pub fn default_features() -> Vec<FeatureFactory> {
    vec![
        feature::<SupportDecorators>,
        feature::<SupportEvents>,
        feature::<SupportJsEvaluation>,
        feature::<SupportRedirects>,
        feature::<SupportScriptsAndAssets>,
        feature::<SupportLazyLoading>,
    ]
}
