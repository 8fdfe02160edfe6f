// Data model module
//
// Contains the parameter model shared by the parser, validator and edit
// session, plus the external rule-table contract.

mod parameter;
mod rules;

pub use parameter::{
    ParamCategory, ParamType, ParamValue, Parameter, Section, ValidationIssue, ValidationRule,
};
pub use rules::{ParameterRule, RuleTable};
