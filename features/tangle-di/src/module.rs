use std::{
    any::{Any, TypeId},
    collections::HashSet,
    sync::Arc,
};

use crate::{binding::BindingDeclaration, types::TypeInfo};

/// Produces a module instance when the builder did not supply one
pub type DefaultInstanceFn = Arc<dyn Fn() -> Arc<dyn Any + Send + Sync> + Send + Sync>;

/// A module: a named set of binding declarations plus the metadata the
/// assembler needs (whether a live instance is required, how to default-
/// construct one, which other modules it pulls in).
#[derive(Clone)]
pub struct ModuleDescriptor {
    pub type_info: TypeInfo,
    /// Has instance-level provider methods
    pub requires_instance: bool,
    pub default_instance: Option<DefaultInstanceFn>,
    pub includes: Vec<ModuleDescriptor>,
    /// Declaration levels, the module's own class first, then its ancestor
    /// chain nearest-first. Signatures seen at an earlier level shadow
    /// identical ones further up.
    pub levels: Vec<ModuleLevel>,
}

#[derive(Clone)]
pub struct ModuleLevel {
    pub name: &'static str,
    pub declarations: Vec<(String, BindingDeclaration)>,
}

impl ModuleLevel {
    pub fn new(name: &'static str) -> Self {
        ModuleLevel {
            name,
            declarations: Vec::new(),
        }
    }

    pub fn declares(mut self, signature: impl Into<String>, declaration: BindingDeclaration) -> Self {
        self.declarations.push((signature.into(), declaration));
        self
    }
}

impl ModuleDescriptor {
    pub fn new<M: 'static>() -> Self {
        let type_info = TypeInfo::of::<M>();
        ModuleDescriptor {
            type_info,
            requires_instance: false,
            default_instance: None,
            includes: Vec::new(),
            levels: vec![ModuleLevel::new(type_info.type_name)],
        }
    }

    /// Adds a declaration to the module's own class level
    pub fn declares(mut self, signature: impl Into<String>, declaration: BindingDeclaration) -> Self {
        self.levels[0]
            .declarations
            .push((signature.into(), declaration));
        self
    }

    /// Appends an ancestor level; call in nearest-ancestor-first order
    pub fn inherits(mut self, level: ModuleLevel) -> Self {
        self.levels.push(level);
        self
    }

    pub fn includes(mut self, module: ModuleDescriptor) -> Self {
        self.includes.push(module);
        self
    }

    pub fn requires_instance(mut self) -> Self {
        self.requires_instance = true;
        self
    }

    pub fn default_instance<M: Send + Sync + 'static>(
        mut self,
        construct: impl Fn() -> M + Send + Sync + 'static,
    ) -> Self {
        self.default_instance = Some(Arc::new(move || Arc::new(construct())));
        self
    }

    /// Walks the level chain, yielding each declaration at most once per
    /// signature. A class and an interface declaring the identical abstract
    /// method contribute one binding.
    pub(crate) fn effective_declarations(&self) -> Vec<&BindingDeclaration> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for level in &self.levels {
            for (signature, declaration) in &level.declarations {
                if seen.insert(signature.as_str()) {
                    out.push(declaration);
                } else {
                    tracing::trace!(
                        module = self.type_info.type_name,
                        level = level.name,
                        signature = signature.as_str(),
                        "declaration shadowed by a more derived level"
                    );
                }
            }
        }
        out
    }
}

/// Flattens explicit modules and their transitive includes, first
/// occurrence of each module type wins.
pub(crate) fn flatten_modules(modules: &[ModuleDescriptor]) -> Vec<&ModuleDescriptor> {
    let mut seen: HashSet<TypeId> = HashSet::new();
    let mut out = Vec::new();
    let mut stack: Vec<&ModuleDescriptor> = modules.iter().rev().collect();
    while let Some(module) = stack.pop() {
        if !seen.insert(module.type_info.type_id) {
            continue;
        }
        out.push(module);
        for included in module.includes.iter().rev() {
            stack.push(included);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::DeclarationKind;
    use crate::types::{Instance, Key};

    fn instance_declaration(value: &str, origin: &str) -> BindingDeclaration {
        BindingDeclaration::new(
            Key::of::<String>(),
            origin,
            DeclarationKind::Instance {
                value: Some(Instance::new(value.to_string())),
            },
        )
    }

    struct ModuleA;
    struct ModuleB;
    struct ModuleC;

    #[test]
    fn identical_signatures_across_levels_collapse() {
        let module = ModuleDescriptor::new::<ModuleA>()
            .declares("string()", instance_declaration("derived", "ModuleA.string"))
            .inherits(
                ModuleLevel::new("BaseModule")
                    .declares("string()", instance_declaration("base", "BaseModule.string")),
            );

        let effective = module.effective_declarations();
        assert_eq!(effective.len(), 1);
        assert_eq!(effective[0].origin, "ModuleA.string");
    }

    #[test]
    fn distinct_signatures_survive_the_walk() {
        let module = ModuleDescriptor::new::<ModuleA>()
            .declares("string()", instance_declaration("one", "ModuleA.string"))
            .inherits(
                ModuleLevel::new("BaseModule")
                    .declares("other()", instance_declaration("two", "BaseModule.other")),
            );

        assert_eq!(module.effective_declarations().len(), 2);
    }

    #[test]
    fn includes_flatten_once_per_module_type() {
        let shared = ModuleDescriptor::new::<ModuleC>();
        let a = ModuleDescriptor::new::<ModuleA>().includes(shared.clone());
        let b = ModuleDescriptor::new::<ModuleB>().includes(shared);

        let modules = [a, b];
        let flat = flatten_modules(&modules);
        let names: Vec<_> = flat.iter().map(|m| m.type_info.type_name).collect();
        assert_eq!(flat.len(), 3);
        assert_eq!(
            names,
            vec![
                std::any::type_name::<ModuleA>(),
                std::any::type_name::<ModuleC>(),
                std::any::type_name::<ModuleB>(),
            ]
        );
    }
}
