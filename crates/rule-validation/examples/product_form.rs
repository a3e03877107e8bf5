//! 商品表单校验示例
//!
//! 演示完整的接入流程：加载配置、初始化日志、注册类型级规则、
//! 订阅变更通知，然后逐步修改商品属性观察错误状态。
//!
//! ```bash
//! RUST_LOG=debug cargo run -p rule-validation --example product_form
//! ```

use std::sync::LazyLock;

use futures::StreamExt;
use rule_validation::{PropertyKey, RuleCollection, Validatable, ValidationState, property_keys};
use tracing::{info, warn};
use validation_shared::config::AppConfig;
use validation_shared::observability;

property_keys! {
    pub enum ProductField {
        Id => "Id",
        Title => "Title",
        Price => "Price",
    }
}

#[derive(Debug)]
pub struct Product {
    id: String,
    title: String,
    price: i64,
    validation: ValidationState<Product>,
}

impl Validatable for Product {
    type Key = ProductField;
    type Error = String;

    fn validation(&self) -> &ValidationState<Self> {
        &self.validation
    }
}

/// 商品类型的规则集合，所有商品实例共享
static PRODUCT_RULES: LazyLock<RuleCollection<Product>> = LazyLock::new(|| {
    let config = AppConfig::load("product-form").unwrap_or_default();
    let rules = RuleCollection::with_options(config.validation);

    rules.add(ProductField::Id, "Id cannot be empty".to_string(), |p: &Product| {
        !p.id.is_empty()
    });
    rules.add(
        ProductField::Title,
        "Title length must be between 6 and 20".to_string(),
        |p: &Product| p.title.len() > 5 && p.title.len() <= 20,
    );
    rules.add(ProductField::Price, "Price must be positive".to_string(), |p: &Product| {
        p.price > 0
    });
    rules
});

impl Product {
    fn new() -> Self {
        Self {
            id: String::new(),
            title: String::new(),
            price: 0,
            validation: ValidationState::new(&PRODUCT_RULES),
        }
    }

    fn set_id(&mut self, value: &str) -> rule_validation::Result<bool> {
        self.set_property(ProductField::Id, value.to_string(), |p| &mut p.id)
    }

    fn set_title(&mut self, value: &str) -> rule_validation::Result<bool> {
        self.set_property(ProductField::Title, value.to_string(), |p| &mut p.title)
    }

    fn set_price(&mut self, value: i64) -> rule_validation::Result<bool> {
        self.set_property(ProductField::Price, value, |p| &mut p.price)
    }
}

fn report(product: &Product) -> anyhow::Result<()> {
    if product.has_errors()? {
        for error in product.errors()? {
            warn!(error = %error, "校验未通过");
        }
    } else {
        info!("商品校验通过");
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load("product-form").unwrap_or_default();
    let _guard = observability::init(&config.observability)?;

    let stats = PRODUCT_RULES.stats();
    info!(
        rules = stats.rules_count,
        properties = stats.properties_count,
        init_mode = ?PRODUCT_RULES.options().init_mode,
        "商品规则已加载"
    );

    let mut product = Product::new();
    product.subscribe_property_changed(|_, event| {
        info!(property = event.name(), "属性已变更");
    });
    product.subscribe_errors_changed(|product, property| {
        let errors = match property {
            Some(key) => product.errors_for(key),
            None => product.errors(),
        };
        info!(
            property = property.as_ref().map(|key| key.name()).unwrap_or("*"),
            errors = ?errors.unwrap_or_default(),
            "错误已变更"
        );
    });
    let changes = product.when_errors_changed();

    report(&product)?;

    product.set_id("sku-1024")?;
    product.set_title("Desk")?;
    product.set_price(1999)?;
    report(&product)?;

    product.set_title("Standing Desk")?;
    report(&product)?;

    drop(product);
    let touched: Vec<_> = futures::executor::block_on(changes.collect());
    info!(count = touched.len(), "错误变更事件总数");

    Ok(())
}
