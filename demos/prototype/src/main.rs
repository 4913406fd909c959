//! Wires a small service graph by hand, playing the role of the front end
//! that normally extracts binding declarations from source metadata.

use std::{collections::HashSet, sync::Arc};

use tangle_di::{
    BindingDeclaration, BuilderDescriptor, ComponentDescriptor, DeclarationKind, DynError,
    Instance, Key, ModuleDescriptor, SetContributionValue,
};

#[derive(Debug, Clone)]
struct AppConfig {
    app_name: String,
    greeting: String,
}

struct GreetingService {
    greeting: String,
}

impl GreetingService {
    fn greet(&self, who: &str) -> String {
        format!("{}, {}!", self.greeting, who)
    }
}

struct ServiceModule;

fn config_key() -> Key {
    Key::of::<AppConfig>()
}

fn service_key() -> Key {
    Key::of::<GreetingService>()
}

fn checks_key() -> Key {
    Key::of::<HashSet<String>>()
}

fn service_module() -> ModuleDescriptor {
    ModuleDescriptor::new::<ServiceModule>()
        .declares(
            "greeting_service(AppConfig)",
            BindingDeclaration::new(
                service_key(),
                "ServiceModule.greeting_service()",
                DeclarationKind::Provider {
                    requires_instance: false,
                    dependencies: vec![config_key()],
                    produce: Arc::new(|_, args| {
                        let config = args[0]
                            .as_ref()
                            .ok_or_else(|| -> DynError { "config must not be null".into() })?
                            .downcast::<AppConfig>()
                            .map_err(|actual| -> DynError {
                                format!("unexpected value type: {actual}").into()
                            })?;
                        Ok(Some(Instance::new(GreetingService {
                            greeting: config.greeting.clone(),
                        })))
                    }),
                },
            )
            .scoped("app"),
        )
        .declares(
            "health_checks()",
            BindingDeclaration::new(
                checks_key(),
                "ServiceModule.health_checks()",
                DeclarationKind::SetBinding {
                    collect: Arc::new(|values| {
                        let mut set = HashSet::new();
                        for value in values {
                            if let SetContributionValue::Single(instance) = value {
                                let check =
                                    instance.downcast::<String>().map_err(|actual| -> DynError {
                                        format!("unexpected value type: {actual}").into()
                                    })?;
                                set.insert(check.as_ref().clone());
                            }
                        }
                        Ok(Instance::new(set))
                    }),
                },
            ),
        )
        .declares(
            "database_check()",
            set_contribution("database", "ServiceModule.database_check()"),
        )
        .declares(
            "queue_check()",
            set_contribution("queue", "ServiceModule.queue_check()"),
        )
}

fn set_contribution(name: &'static str, origin: &str) -> BindingDeclaration {
    BindingDeclaration::new(
        checks_key(),
        origin,
        DeclarationKind::IntoSet {
            requires_instance: false,
            dependencies: vec![],
            produce: Arc::new(move |_, _| Ok(Some(Instance::new(name.to_string())))),
        },
    )
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    let descriptor = ComponentDescriptor::new("prototype::AppComponent")
        .scope("app")
        .module(service_module())
        .bound_instance(config_key(), false)
        .accessor(service_key())
        .accessor(checks_key())
        .builder_shape(
            BuilderDescriptor::new("prototype::AppComponent.Builder")
                .instance_setter("config", config_key()),
        );

    let component = descriptor
        .builder()
        .expect("component shape is valid")
        .instance_of(AppConfig {
            app_name: "prototype".to_string(),
            greeting: "Hello".to_string(),
        })
        .expect("config setter is declared")
        .build()
        .expect("all builder inputs are supplied");

    let config = component.resolve::<AppConfig>().expect("config is bound");
    tracing::info!(app = config.app_name.as_str(), "starting");

    let service = component
        .resolve::<GreetingService>()
        .expect("service graph resolves");
    println!("{}", service.greet("world"));

    let checks = component
        .resolve::<HashSet<String>>()
        .expect("health checks aggregate");
    let mut names: Vec<_> = checks.iter().map(String::as_str).collect();
    names.sort_unstable();
    println!("registered health checks: {}", names.join(", "));
}
