mod support;

use std::sync::{Arc, Mutex};

use support::*;
use tangle_di::{
    ClassInjections, ComponentDescriptor, DynError, FieldInjection, InjectionTarget,
    InjectorReturn, Key, MemberModifiers, MembersInjector, MethodInjection, ModuleDescriptor,
};

fn string_key() -> Key {
    Key::of::<String>()
}

struct Module1;

fn foo_module() -> ModuleDescriptor {
    ModuleDescriptor::new::<Module1>().declares(
        "string()",
        provides(string_key(), "Module1.string()", || "foo".to_string()),
    )
}

#[test]
fn it_injects_nothing_into_an_empty_target() {
    #[derive(Default)]
    struct Target;

    let component = ComponentDescriptor::new("demo::MemberInjectionEmpty")
        .injection_target(InjectionTarget::new::<Target>())
        .create()
        .unwrap();

    let mut target = Target;
    component.inject(&mut target).unwrap();
}

#[test]
fn it_leaves_an_undeclared_type_untouched() {
    #[derive(Default)]
    struct Target {
        one: Option<String>,
        count: usize,
    }

    let component = ComponentDescriptor::new("demo::MemberInjectionNoInjects")
        .module(foo_module())
        .create()
        .unwrap();

    let mut target = Target::default();
    component.inject(&mut target).unwrap();
    assert!(target.one.is_none());
    assert_eq!(target.count, 0);
}

#[test]
fn it_injects_declared_fields_and_methods() {
    #[derive(Default)]
    struct Target {
        from_field: Option<String>,
        from_method: Option<String>,
    }

    let component = ComponentDescriptor::new("demo::MemberInjection")
        .module(foo_module())
        .injection_target(
            InjectionTarget::new::<Target>().class(
                ClassInjections::new("Target")
                    .field(FieldInjection::new(
                        "from_field",
                        string_key(),
                        set_field::<Target, String, _>(|target, value| {
                            target.from_field = Some(value.as_ref().clone());
                        }),
                    ))
                    .method(MethodInjection::new(
                        "method",
                        vec![string_key()],
                        call_method::<Target, _>(|target, args| {
                            target.from_method =
                                Some(arg::<String>(args, 0)?.as_ref().clone());
                            Ok(())
                        }),
                    )),
            ),
        )
        .create()
        .unwrap();

    let mut target = Target::default();
    component.inject(&mut target).unwrap();
    assert_eq!(target.from_field.as_deref(), Some("foo"));
    assert_eq!(target.from_method.as_deref(), Some("foo"));
}

#[test]
fn it_injects_qualified_member_sites() {
    #[derive(Default)]
    struct Target {
        from_field: Option<String>,
    }

    let qualified = Key::qualified::<String>("named");
    let component = ComponentDescriptor::new("demo::MemberInjectionQualified")
        .module(ModuleDescriptor::new::<Module1>().declares(
            "named()",
            provides(qualified, "Module1.named()", || "foo".to_string()),
        ))
        .injection_target(
            InjectionTarget::new::<Target>().class(ClassInjections::new("Target").field(
                FieldInjection::new(
                    "from_field",
                    qualified,
                    set_field::<Target, String, _>(|target, value| {
                        target.from_field = Some(value.as_ref().clone());
                    }),
                ),
            )),
        )
        .create()
        .unwrap();

    let mut target = Target::default();
    component.inject(&mut target).unwrap();
    assert_eq!(target.from_field.as_deref(), Some("foo"));
}

/// Transcript-recording target for the ordering contract: constructor
/// first, then base fields, base methods, subclass fields, subclass
/// methods.
struct OrderTarget {
    base_field: Option<String>,
    sub_field: Option<String>,
    calls: Vec<String>,
}

impl OrderTarget {
    fn new() -> Self {
        let mut calls = Vec::new();
        calls.push("instantiation: base_field=none, sub_field=none".to_string());
        OrderTarget {
            base_field: None,
            sub_field: None,
            calls,
        }
    }

    fn describe(&self) -> String {
        format!(
            "base_field={}, sub_field={}",
            self.base_field.as_deref().unwrap_or("none"),
            self.sub_field.as_deref().unwrap_or("none")
        )
    }
}

fn order_target_descriptor() -> InjectionTarget {
    InjectionTarget::new::<OrderTarget>()
        .class(
            ClassInjections::new("Base")
                .field(FieldInjection::new(
                    "base_field",
                    string_key(),
                    set_field::<OrderTarget, String, _>(|target, value| {
                        target.base_field = Some(value.as_ref().clone());
                    }),
                ))
                .method(MethodInjection::new(
                    "base_method",
                    vec![string_key()],
                    call_method::<OrderTarget, _>(|target, args| {
                        let value = arg::<String>(args, 0)?;
                        let state = target.describe();
                        target.calls.push(format!("base_method({value}): {state}"));
                        Ok(())
                    }),
                )),
        )
        .class(
            ClassInjections::new("SubType")
                .field(FieldInjection::new(
                    "sub_field",
                    string_key(),
                    set_field::<OrderTarget, String, _>(|target, value| {
                        target.sub_field = Some(value.as_ref().clone());
                    }),
                ))
                .method(MethodInjection::new(
                    "sub_method",
                    vec![string_key()],
                    call_method::<OrderTarget, _>(|target, args| {
                        let value = arg::<String>(args, 0)?;
                        let state = target.describe();
                        target.calls.push(format!("sub_method({value}): {state}"));
                        Ok(())
                    }),
                )),
        )
}

#[test]
fn it_injects_base_members_before_subtype_members() {
    let component = ComponentDescriptor::new("demo::MemberInjectionOrder")
        .module(foo_module())
        .injection_target(order_target_descriptor())
        .create()
        .unwrap();

    let mut target = OrderTarget::new();
    component.inject(&mut target).unwrap();

    assert_eq!(
        target.calls,
        vec![
            "instantiation: base_field=none, sub_field=none",
            "base_method(foo): base_field=foo, sub_field=none",
            "sub_method(foo): base_field=foo, sub_field=foo",
        ]
    );
}

#[test]
fn it_applies_fields_before_methods_within_a_class() {
    struct Target {
        field_before_method: bool,
        field: Option<String>,
    }

    let component = ComponentDescriptor::new("demo::MemberInjectionFieldBeforeMethod")
        .module(foo_module())
        .injection_target(
            InjectionTarget::new::<Target>().class(
                ClassInjections::new("Target")
                    .field(FieldInjection::new(
                        "field",
                        string_key(),
                        set_field::<Target, String, _>(|target, value| {
                            target.field = Some(value.as_ref().clone());
                        }),
                    ))
                    .method(MethodInjection::new(
                        "method",
                        vec![string_key()],
                        call_method::<Target, _>(|target, _| {
                            target.field_before_method = target.field.is_some();
                            Ok(())
                        }),
                    )),
            ),
        )
        .create()
        .unwrap();

    let mut target = Target {
        field_before_method: false,
        field: None,
    };
    component.inject(&mut target).unwrap();
    assert!(target.field_before_method);
}

fn rejecting_field(name: &'static str, modifiers: MemberModifiers) -> FieldInjection {
    FieldInjection::new(
        name,
        Key::of::<String>(),
        Arc::new(|_, _| -> Result<(), DynError> {
            unreachable!("validation must reject before mutation")
        }),
    )
    .modifiers(modifiers)
}

fn rejecting_method(name: &'static str, modifiers: MemberModifiers) -> MethodInjection {
    MethodInjection::new(
        name,
        vec![Key::of::<String>()],
        Arc::new(|_, _| -> Result<(), DynError> {
            unreachable!("validation must reject before mutation")
        }),
    )
    .modifiers(modifiers)
}

struct FlaggedTarget;

fn flagged_component(class: ClassInjections) -> tangle_di::Component {
    ComponentDescriptor::new("demo::MembersInjectionFlagged")
        .module(foo_module())
        .injection_target(InjectionTarget::new::<FlaggedTarget>().class(class))
        .create()
        .unwrap()
}

#[test]
fn it_rejects_injection_into_a_private_field() {
    let component = flagged_component(ClassInjections::new("Target").field(rejecting_field(
        "private_field",
        MemberModifiers {
            is_private: true,
            ..Default::default()
        },
    )));

    let err = component.inject(&mut FlaggedTarget).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Injection into private fields is not supported: Target.private_field"
    );
}

#[test]
fn it_rejects_injection_into_a_static_field() {
    let component = flagged_component(ClassInjections::new("Target").field(rejecting_field(
        "static_field",
        MemberModifiers {
            is_static: true,
            ..Default::default()
        },
    )));

    let err = component.inject(&mut FlaggedTarget).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Injection into static fields is not supported: Target.static_field"
    );
}

#[test]
fn it_rejects_injection_into_a_private_method() {
    let component = flagged_component(ClassInjections::new("Target").method(rejecting_method(
        "private_method",
        MemberModifiers {
            is_private: true,
            ..Default::default()
        },
    )));

    let err = component.inject(&mut FlaggedTarget).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Injection into private methods is not supported: Target.private_method()"
    );
}

#[test]
fn it_rejects_injection_into_a_static_method() {
    let component = flagged_component(ClassInjections::new("Target").method(rejecting_method(
        "static_method",
        MemberModifiers {
            is_static: true,
            ..Default::default()
        },
    )));

    let err = component.inject(&mut FlaggedTarget).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Injection into static methods is not supported: Target.static_method()"
    );
}

#[test]
fn it_rejects_injection_into_an_abstract_method() {
    let component = flagged_component(ClassInjections::new("Target").method(rejecting_method(
        "abstract_method",
        MemberModifiers {
            is_abstract: true,
            ..Default::default()
        },
    )));

    let err = component.inject(&mut FlaggedTarget).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Injected methods may not be abstract: Target.abstract_method"
    );
}

#[test]
fn it_validates_every_member_before_mutating_any() {
    let touched = Arc::new(Mutex::new(Vec::<&'static str>::new()));
    let record = touched.clone();

    struct Target;

    let component = ComponentDescriptor::new("demo::ValidationFirst")
        .module(foo_module())
        .injection_target(
            InjectionTarget::new::<Target>().class(
                ClassInjections::new("Target")
                    .field(FieldInjection::new(
                        "good_field",
                        string_key(),
                        Arc::new(move |_, _| {
                            record.lock().unwrap().push("good_field");
                            Ok(())
                        }),
                    ))
                    .method(rejecting_method(
                        "private_method",
                        MemberModifiers {
                            is_private: true,
                            ..Default::default()
                        },
                    )),
            ),
        )
        .create()
        .unwrap();

    let err = component.inject(&mut Target).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Injection into private methods is not supported: Target.private_method()"
    );
    assert!(touched.lock().unwrap().is_empty());
}

#[test]
fn it_rejects_an_injector_method_with_a_foreign_return_type() {
    struct Target;

    let component = ComponentDescriptor::new("demo::MembersInjectorWrongReturnType")
        .members_injector(MembersInjector::new::<Target>(
            "demo::MembersInjectorWrongReturnType.inject",
            InjectorReturn::Other,
        ))
        .injection_target(InjectionTarget::new::<Target>())
        .create()
        .unwrap();

    let err = component.inject(&mut Target).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Members injection methods may only return the injected type or void: \
         demo::MembersInjectorWrongReturnType.inject"
    );
}

#[test]
fn it_accepts_an_injector_method_returning_the_injected_type() {
    #[derive(Default)]
    struct Target {
        foo: Option<String>,
    }

    let component = ComponentDescriptor::new("demo::MemberInjectionReturnInstance")
        .module(foo_module())
        .members_injector(MembersInjector::new::<Target>(
            "demo::MemberInjectionReturnInstance.inject",
            InjectorReturn::Target,
        ))
        .injection_target(
            InjectionTarget::new::<Target>().class(ClassInjections::new("Target").field(
                FieldInjection::new(
                    "foo",
                    string_key(),
                    set_field::<Target, String, _>(|target, value| {
                        target.foo = Some(value.as_ref().clone());
                    }),
                ),
            )),
        )
        .create()
        .unwrap();

    let mut target = Target::default();
    component.inject(&mut target).unwrap();
    assert_eq!(target.foo.as_deref(), Some("foo"));
}

#[test]
fn it_applies_members_after_a_just_in_time_construction() {
    struct Service {
        label: Option<String>,
    }

    let component = ComponentDescriptor::new("demo::ConstructorThenMembers")
        .module(foo_module())
        .constructible(constructor("Service::new", || Service { label: None }))
        .injection_target(
            InjectionTarget::new::<Service>().class(ClassInjections::new("Service").field(
                FieldInjection::new(
                    "label",
                    string_key(),
                    set_field::<Service, String, _>(|service, value| {
                        service.label = Some(value.as_ref().clone());
                    }),
                ),
            )),
        )
        .accessor(Key::of::<Service>())
        .create()
        .unwrap();

    let service = component.resolve::<Service>().unwrap();
    assert_eq!(service.label.as_deref(), Some("foo"));
}
