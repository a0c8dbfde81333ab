//! Runtime callables: user functions, classes, and instances.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use ember_par::ast::FunctionDecl;

use crate::env::Environment;
use crate::value::Value;

/// A user-defined function value: a shared declaration plus the
/// environment captured at its definition site.
pub struct Function {
    declaration: Rc<FunctionDecl>,
    closure: Rc<Environment>,
    is_initializer: bool,
}

impl Function {
    /// Creates a function value capturing the given environment.
    pub fn new(declaration: Rc<FunctionDecl>, closure: Rc<Environment>, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    /// The declared name.
    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    /// Number of declared parameters.
    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// The shared declaration.
    pub fn declaration(&self) -> &Rc<FunctionDecl> {
        &self.declaration
    }

    /// The captured environment.
    pub fn closure(&self) -> &Rc<Environment> {
        &self.closure
    }

    /// Whether this function is an `init` method. Initializer calls
    /// return `this` regardless of how the body completes.
    pub fn is_initializer(&self) -> bool {
        self.is_initializer
    }

    /// Produces a bound method: a fresh function whose closure wraps
    /// this one with `this` bound to the instance at depth 0. The
    /// initializer flag carries over.
    pub fn bind(&self, instance: Rc<Instance>) -> Function {
        let env = Environment::with_enclosing(Rc::clone(&self.closure));
        env.define("this", Value::Instance(instance));
        Function {
            declaration: Rc::clone(&self.declaration),
            closure: env,
            is_initializer: self.is_initializer,
        }
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The closure is omitted: environment chains alias and may
        // contain reference cycles through class methods.
        f.debug_struct("Function")
            .field("name", &self.name())
            .field("arity", &self.arity())
            .field("is_initializer", &self.is_initializer)
            .finish()
    }
}

/// A class value: name, optional superclass, and methods bound to the
/// class's defining environment.
pub struct Class {
    /// Class name, used for stringification.
    pub name: String,
    /// Superclass, if declared.
    pub superclass: Option<Rc<Class>>,
    /// Method table in declaration order.
    pub methods: IndexMap<String, Rc<Function>>,
}

impl Class {
    /// Looks up a method on this class or, failing that, up the
    /// superclass chain.
    pub fn find_method(&self, name: &str) -> Option<Rc<Function>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// Construction arity: the `init` method's arity, or zero if the
    /// chain declares none.
    pub fn arity(&self) -> usize {
        self.find_method("init").map_or(0, |init| init.arity())
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// An instance: a class reference plus mutable fields.
pub struct Instance {
    /// The instantiated class.
    pub class: Rc<Class>,
    fields: RefCell<IndexMap<String, Value>>,
}

impl Instance {
    /// Creates a fieldless instance of the class.
    pub fn new(class: Rc<Class>) -> Self {
        Self {
            class,
            fields: RefCell::new(IndexMap::new()),
        }
    }

    /// Property read: a field if present, otherwise a freshly bound
    /// method from the class chain. `None` means undefined property.
    pub fn get(instance: &Rc<Instance>, name: &str) -> Option<Value> {
        if let Some(value) = instance.fields.borrow().get(name) {
            return Some(value.clone());
        }
        instance
            .class
            .find_method(name)
            .map(|method| Value::Function(Rc::new(method.bind(Rc::clone(instance)))))
    }

    /// Property write: creates or replaces the field.
    pub fn set(&self, name: &str, value: Value) {
        self.fields.borrow_mut().insert(name.to_string(), value);
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Fields are omitted: instances may reference each other
        // cyclically.
        write!(f, "Instance({})", self.class.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decl(name: &str, params: &[&str]) -> Rc<FunctionDecl> {
        use ember_lex::{Token, TokenKind};
        use ember_util::Span;

        Rc::new(FunctionDecl {
            name: Token::new(TokenKind::Identifier, name, None, Span::DUMMY),
            params: params
                .iter()
                .map(|p| Token::new(TokenKind::Identifier, *p, None, Span::DUMMY))
                .collect(),
            body: Vec::new(),
        })
    }

    fn class_with_method(name: &str, method: &str) -> Rc<Class> {
        let globals = Environment::new();
        let mut methods = IndexMap::new();
        methods.insert(
            method.to_string(),
            Rc::new(Function::new(decl(method, &[]), globals, false)),
        );
        Rc::new(Class {
            name: name.to_string(),
            superclass: None,
            methods,
        })
    }

    #[test]
    fn test_function_arity() {
        let globals = Environment::new();
        let f = Function::new(decl("add", &["a", "b"]), globals, false);
        assert_eq!(f.arity(), 2);
        assert_eq!(f.name(), "add");
    }

    #[test]
    fn test_find_method_on_class() {
        let class = class_with_method("C", "m");
        assert!(class.find_method("m").is_some());
        assert!(class.find_method("missing").is_none());
    }

    #[test]
    fn test_find_method_walks_superclass_chain() {
        let base = class_with_method("Base", "hello");
        let derived = Rc::new(Class {
            name: "Derived".to_string(),
            superclass: Some(Rc::clone(&base)),
            methods: IndexMap::new(),
        });
        assert!(derived.find_method("hello").is_some());
    }

    #[test]
    fn test_subclass_method_shadows_super() {
        let base = class_with_method("Base", "m");
        let mut methods = IndexMap::new();
        let globals = Environment::new();
        let own = Rc::new(Function::new(decl("m", &["x"]), globals, false));
        methods.insert("m".to_string(), Rc::clone(&own));
        let derived = Rc::new(Class {
            name: "Derived".to_string(),
            superclass: Some(base),
            methods,
        });

        let found = derived.find_method("m").expect("method found");
        assert!(Rc::ptr_eq(&found, &own));
    }

    #[test]
    fn test_class_arity_follows_init() {
        let globals = Environment::new();
        let mut methods = IndexMap::new();
        methods.insert(
            "init".to_string(),
            Rc::new(Function::new(decl("init", &["v"]), globals, true)),
        );
        let class = Rc::new(Class {
            name: "Box".to_string(),
            superclass: None,
            methods,
        });
        assert_eq!(class.arity(), 1);

        let plain = class_with_method("Plain", "m");
        assert_eq!(plain.arity(), 0);
    }

    #[test]
    fn test_instance_fields() {
        let class = class_with_method("C", "m");
        let instance = Rc::new(Instance::new(class));
        instance.set("x", Value::Number(1.0));
        assert!(matches!(
            Instance::get(&instance, "x"),
            Some(Value::Number(n)) if n == 1.0
        ));
    }

    #[test]
    fn test_field_shadows_method() {
        let class = class_with_method("C", "m");
        let instance = Rc::new(Instance::new(class));
        instance.set("m", Value::Number(3.0));
        assert!(matches!(
            Instance::get(&instance, "m"),
            Some(Value::Number(n)) if n == 3.0
        ));
    }

    #[test]
    fn test_method_lookup_returns_fresh_bound_values() {
        let class = class_with_method("C", "m");
        let instance = Rc::new(Instance::new(class));

        let first = Instance::get(&instance, "m").expect("bound method");
        let second = Instance::get(&instance, "m").expect("bound method");
        // Each get constructs a new bound method value.
        assert!(!first.equals(&second));
    }

    #[test]
    fn test_bound_method_closure_sees_this() {
        let class = class_with_method("C", "m");
        let instance = Rc::new(Instance::new(Rc::clone(&class)));
        let method = class.find_method("m").expect("method");
        let bound = method.bind(Rc::clone(&instance));

        match bound.closure().get("this") {
            Some(Value::Instance(bound_to)) => assert!(Rc::ptr_eq(&bound_to, &instance)),
            other => panic!("expected bound this, got {:?}", other),
        }
    }

    #[test]
    fn test_undefined_property() {
        let class = class_with_method("C", "m");
        let instance = Rc::new(Instance::new(class));
        assert!(Instance::get(&instance, "ghost").is_none());
    }
}
