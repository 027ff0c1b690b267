//! Which methods a generated surface exposes.

use crate::definition::{Callable, MethodDefinition, SurfaceConfig, Visibility};

/// The deny-list wins over everything. Non-public methods, static methods and disabled
/// surfaces are never exposed. Otherwise a method is exposed when the surface makes every
/// method callable, when it makes public async methods callable and the method is async, or
/// when the method is on the allow-list.
pub fn should_include_method(method: &MethodDefinition, config: &SurfaceConfig) -> bool {
    if config.exclude_methods.iter().any(|m| m == &method.name) {
        return false;
    }
    if method.visibility != Visibility::Public || method.is_static || !config.enabled {
        return false;
    }
    match config.callable {
        Callable::All => true,
        Callable::PublicAsync if method.is_async => true,
        _ => config.methods.iter().any(|m| m == &method.name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface(callable: Callable) -> SurfaceConfig {
        SurfaceConfig {
            callable,
            ..SurfaceConfig::default()
        }
    }

    #[test]
    fn test_callable_modes() {
        let sync_m = MethodDefinition::new("summarize");
        let async_m = MethodDefinition::new("publish").asynchronous();

        assert!(should_include_method(&sync_m, &surface(Callable::All)));
        assert!(should_include_method(&async_m, &surface(Callable::PublicAsync)));
        assert!(!should_include_method(&sync_m, &surface(Callable::PublicAsync)));
        assert!(!should_include_method(&async_m, &surface(Callable::None)));
    }

    #[test]
    fn test_allow_list() {
        let m = MethodDefinition::new("summarize");
        let mut config = surface(Callable::None);
        config.methods = vec!["summarize".into()];
        assert!(should_include_method(&m, &config));
    }

    #[test]
    fn test_exclusions_win() {
        let m = MethodDefinition::new("publish").asynchronous();
        let mut config = surface(Callable::All);
        config.methods = vec!["publish".into()];
        config.exclude_methods = vec!["publish".into()];
        assert!(!should_include_method(&m, &config));

        let all = surface(Callable::All);
        assert!(!should_include_method(
            &MethodDefinition::new("helper").with_visibility(Visibility::Private),
            &all
        ));
        assert!(!should_include_method(&MethodDefinition::new("create").static_method(), &all));
        let mut disabled = SurfaceConfig::disabled();
        disabled.callable = Callable::All;
        assert!(!should_include_method(&MethodDefinition::new("publish"), &disabled));
    }
}
