//! Injection tests over derived fixtures: completeness, idempotence, tie-breaks and depth.

use std::sync::Arc;

use mockrule::{
    DoubleCore, DoubleRegistry, FieldRole, Injectable, MockContext, MockFixture, RuleConfig, TieBreak, Wiring,
    init_mocks, scan,
};

pub trait Store {
    fn get(&self, key: &str) -> Option<String>;
}

struct StoreDouble(DoubleCore);

impl Store for StoreDouble {
    fn get(&self, key: &str) -> Option<String> {
        self.0.invoke("get", key)
    }
}

pub trait Clock {
    fn now(&self) -> u64;
}

struct ClockDouble(DoubleCore);

impl Clock for ClockDouble {
    fn now(&self) -> u64 {
        self.0.invoke("now", ())
    }
}

fn registry() -> DoubleRegistry {
    DoubleRegistry::new()
        .with(|core| Arc::new(StoreDouble(core)) as Arc<dyn Store>)
        .with(|core| Arc::new(ClockDouble(core)) as Arc<dyn Clock>)
}

fn called_doubles(ctx: &MockContext) -> Vec<String> {
    ctx.invocations().iter().map(|call| call.double_name.to_string()).collect()
}

// ========================================
// Fixtures
// ========================================

#[derive(Default, Injectable)]
struct Cache {
    primary: Option<Arc<dyn Store>>,
    backup: Option<Arc<dyn Store>>,
    store: Option<Arc<dyn Store>>,
    clock: Option<Arc<dyn Clock>>,
    #[inject(skip)]
    audit: Option<Arc<dyn Clock>>,
    capacity: usize,
}

#[derive(Default, MockFixture)]
struct CacheTest {
    #[mock]
    backup: Option<Arc<dyn Store>>,
    #[mock]
    primary: Option<Arc<dyn Store>>,
    #[mock]
    clock: Option<Arc<dyn Clock>>,
    #[inject_mocks]
    cache: Option<Cache>,
    label: &'static str,
}

fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => Arc::ptr_eq(a, b),
        _ => false,
    }
}

// ========================================
// Scanning derived fixtures
// ========================================

#[test]
fn derived_fixture_lists_fields_in_declaration_order() {
    let fixture = CacheTest::default();
    let fields = scan(&fixture).unwrap();
    let summary: Vec<_> = fields.iter().map(|f| (f.name(), f.role())).collect();
    assert_eq!(
        summary,
        vec![
            ("backup", FieldRole::MockTarget),
            ("primary", FieldRole::MockTarget),
            ("clock", FieldRole::MockTarget),
            ("cache", FieldRole::InjectTarget),
            ("label", FieldRole::Ordinary),
        ]
    );
    assert_eq!(fixture.fixture_name(), "CacheTest");
}

#[test]
fn injectable_marks_option_fields_as_candidates() {
    let cache = Cache::default();
    let candidates: Vec<_> = scan(&cache)
        .unwrap()
        .into_iter()
        .filter(|f| f.accepts_doubles())
        .map(|f| f.name().to_string())
        .collect();
    assert_eq!(candidates, vec!["primary", "backup", "store", "clock"]);
}

// ========================================
// Completeness and tie-breaks
// ========================================

#[test]
fn every_mock_target_receives_a_double() {
    let mut fixture = CacheTest::default();
    let report = init_mocks(&mut fixture, &registry(), &MockContext::new(), &RuleConfig::default()).unwrap();

    assert!(fixture.backup.is_some());
    assert!(fixture.primary.is_some());
    assert!(fixture.clock.is_some());
    assert_eq!(report.created, vec!["backup", "primary", "clock"]);
    assert!(report.reused.is_empty());
    assert_eq!(report.constructed, vec!["cache"]);
    assert_eq!(fixture.label, "");
}

#[test]
fn name_match_wins_then_declaration_order() {
    let mut fixture = CacheTest::default();
    init_mocks(&mut fixture, &registry(), &MockContext::new(), &RuleConfig::default()).unwrap();
    let cache = fixture.cache.as_ref().unwrap();

    assert!(same(&cache.primary, &fixture.primary));
    assert!(same(&cache.backup, &fixture.backup));
    // No mock is named `store`: first `Store` mock in declaration order.
    assert!(same(&cache.store, &fixture.backup));
    assert!(same(&cache.clock, &fixture.clock));
    assert!(cache.audit.is_none());
    assert_eq!(cache.capacity, 0);
}

#[test]
fn declaration_order_policy_ignores_names() {
    let mut fixture = CacheTest::default();
    let config = RuleConfig::new().with_tie_break(TieBreak::DeclarationOrder);
    let report = init_mocks(&mut fixture, &registry(), &MockContext::new(), &config).unwrap();
    let cache = fixture.cache.as_ref().unwrap();

    assert!(same(&cache.primary, &fixture.backup));
    assert!(same(&cache.backup, &fixture.backup));
    assert!(same(&cache.store, &fixture.backup));
    assert!(report.wired.contains(&Wiring {
        target: "cache".into(),
        field: "primary".into(),
        mock: "backup".into(),
    }));
}

#[test]
fn doubles_are_named_after_their_fields() {
    let ctx = MockContext::new();
    let mut fixture = CacheTest::default();
    init_mocks(&mut fixture, &registry(), &ctx, &RuleConfig::default()).unwrap();

    let clock = fixture.clock.clone().unwrap();
    clock.now();
    fixture.primary.as_ref().unwrap().get("k");
    assert_eq!(called_doubles(&ctx), vec!["clock", "primary"]);
}

// ========================================
// Idempotence
// ========================================

#[test]
fn second_pass_reuses_everything() {
    let ctx = MockContext::new();
    let mut fixture = CacheTest::default();
    init_mocks(&mut fixture, &registry(), &ctx, &RuleConfig::default()).unwrap();
    let primary = fixture.primary.clone();
    let cache_store = fixture.cache.as_ref().unwrap().store.clone();

    let report = init_mocks(&mut fixture, &registry(), &ctx, &RuleConfig::default()).unwrap();

    assert!(report.created.is_empty());
    assert!(report.constructed.is_empty());
    assert_eq!(report.reused, vec!["backup", "primary", "clock"]);
    assert!(same(&fixture.primary, &primary));
    assert!(same(&fixture.cache.as_ref().unwrap().store, &cache_store));
}

// ========================================
// Depth
// ========================================

// `Option<_>` fields of an injectable are wiring candidates, so their type must be `Clone`.
#[derive(Clone, Default, Injectable)]
struct Repository {
    clock: Option<Arc<dyn Clock>>,
}

#[derive(Default, Injectable)]
struct Service {
    clock: Option<Arc<dyn Clock>>,
    repository: Option<Repository>,
}

#[derive(Default, MockFixture)]
struct ServiceTest {
    #[mock]
    clock: Option<Arc<dyn Clock>>,
    #[inject_mocks]
    service: Option<Service>,
}

#[test]
fn injection_is_one_level_deep() {
    let mut fixture = ServiceTest::default();
    init_mocks(&mut fixture, &registry(), &MockContext::new(), &RuleConfig::default()).unwrap();

    let service = fixture.service.as_ref().unwrap();
    assert!(same(&service.clock, &fixture.clock));
    // `Option<Repository>` is not a double type and nested targets are never constructed.
    assert!(service.repository.is_none());
}

#[test]
fn nested_target_present_is_left_alone() {
    let mut fixture = ServiceTest {
        clock: None,
        service: Some(Service {
            clock: None,
            repository: Some(Repository::default()),
        }),
    };
    init_mocks(&mut fixture, &registry(), &MockContext::new(), &RuleConfig::default()).unwrap();

    let service = fixture.service.as_ref().unwrap();
    assert!(service.clock.is_some());
    assert!(service.repository.as_ref().unwrap().clock.is_none());
}

// ========================================
// Derive options
// ========================================

fn sized_buffer() -> Buffer {
    Buffer {
        capacity: 64,
        clock: None,
    }
}

#[derive(Injectable)]
#[injectable(constructor = sized_buffer)]
struct Buffer {
    capacity: usize,
    clock: Option<Arc<dyn Clock>>,
}

#[derive(MockFixture)]
struct BufferTest {
    #[mock]
    clock: Option<Arc<dyn Clock>>,
    #[inject_mocks]
    buffer: Option<Buffer>,
}

#[test]
fn custom_constructor_is_used() {
    let mut fixture = BufferTest { clock: None, buffer: None };
    init_mocks(&mut fixture, &registry(), &MockContext::new(), &RuleConfig::default()).unwrap();

    let buffer = fixture.buffer.as_ref().unwrap();
    assert_eq!(buffer.capacity, 64);
    assert!(same(&buffer.clock, &fixture.clock));
}

#[derive(MockFixture)]
struct GenericTest<T: Clone + 'static> {
    #[mock]
    value: Option<T>,
    name: String,
}

#[test]
fn generic_fixtures_are_supported() {
    let mut fixture = GenericTest::<u32> {
        value: None,
        name: "generic".into(),
    };
    let registry = DoubleRegistry::new().with(|_| 11_u32);
    init_mocks(&mut fixture, &registry, &MockContext::new(), &RuleConfig::default()).unwrap();
    assert_eq!(fixture.value, Some(11));
    assert_eq!(fixture.name, "generic");
}
