//! 校验引擎性质测试
//!
//! 对随机的赋值序列检查：增量维护的错误缓存与从头全量校验的结果一致。

use proptest::prelude::*;
use rule_validation::{RuleCollection, Validatable, ValidationState, property_keys};

property_keys! {
    pub enum FormField {
        Username => "Username",
        Password => "Password",
        Nickname => "Nickname",
    }
}

#[derive(Debug)]
pub struct SignupForm {
    username: String,
    password: String,
    nickname: String,
    validation: ValidationState<SignupForm>,
}

impl Validatable for SignupForm {
    type Key = FormField;
    type Error = String;

    fn validation(&self) -> &ValidationState<Self> {
        &self.validation
    }
}

impl SignupForm {
    fn new(rules: &RuleCollection<SignupForm>) -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            nickname: String::new(),
            validation: ValidationState::new(rules),
        }
    }

    fn set(&mut self, field: FormField, value: String) -> bool {
        let result = match field {
            FormField::Username => self.set_property(field, value, |f| &mut f.username),
            FormField::Password => self.set_property(field, value, |f| &mut f.password),
            FormField::Nickname => self.set_property(field, value, |f| &mut f.nickname),
        };
        result.unwrap()
    }

    fn fresh_copy(&self, rules: &RuleCollection<SignupForm>) -> Self {
        let mut copy = Self::new(rules);
        copy.username = self.username.clone();
        copy.password = self.password.clone();
        copy.nickname = self.nickname.clone();
        copy
    }
}

fn form_rules() -> RuleCollection<SignupForm> {
    let rules = RuleCollection::new();
    rules.add(FormField::Username, "username required".to_string(), |f: &SignupForm| {
        !f.username.is_empty()
    });
    rules.add(FormField::Password, "password too short".to_string(), |f: &SignupForm| {
        f.password.len() >= 4
    });
    rules.add(FormField::Username, "username too long".to_string(), |f: &SignupForm| {
        f.username.len() <= 6
    });
    rules.add(FormField::Password, "password needs digit".to_string(), |f: &SignupForm| {
        f.password.chars().any(|c| c.is_ascii_digit())
    });
    rules
}

fn field_strategy() -> impl Strategy<Value = FormField> {
    prop_oneof![
        Just(FormField::Username),
        Just(FormField::Password),
        Just(FormField::Nickname),
    ]
}

fn assignment_strategy() -> impl Strategy<Value = (FormField, String)> {
    (field_strategy(), "[a-z0-9]{0,8}")
}

proptest! {
    #[test]
    fn prop_has_errors_matches_error_list(assignments in prop::collection::vec(assignment_strategy(), 0..20)) {
        let rules = form_rules();
        let mut form = SignupForm::new(&rules);

        for (field, value) in assignments {
            form.set(field, value);
            prop_assert_eq!(form.has_errors().unwrap(), !form.errors().unwrap().is_empty());
        }
    }

    #[test]
    fn prop_incremental_matches_full_scan(assignments in prop::collection::vec(assignment_strategy(), 0..20)) {
        let rules = form_rules();
        let mut form = SignupForm::new(&rules);

        for (field, value) in assignments {
            form.set(field, value);

            let fresh = form.fresh_copy(&rules);
            prop_assert_eq!(form.errors().unwrap(), fresh.errors().unwrap());
            for key in FormField::ALL {
                prop_assert_eq!(form.errors_for(key).unwrap(), fresh.errors_for(key).unwrap());
            }
        }
    }

    #[test]
    fn prop_unruled_property_never_has_errors(values in prop::collection::vec("[a-z0-9]{0,8}", 0..10)) {
        let rules = form_rules();
        let mut form = SignupForm::new(&rules);

        for value in values {
            form.set(FormField::Nickname, value);
            prop_assert!(form.errors_for(&FormField::Nickname).unwrap().is_empty());
        }
    }

    #[test]
    fn prop_equal_assignment_is_noop(value in "[a-z0-9]{0,8}") {
        let rules = form_rules();
        let mut form = SignupForm::new(&rules);
        form.set(FormField::Username, value.clone());
        let before = form.errors().unwrap();

        prop_assert!(!form.set(FormField::Username, value));
        prop_assert_eq!(form.errors().unwrap(), before);
    }
}
