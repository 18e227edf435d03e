//! # 仪器装配
//!
//! 按声明顺序累积组件，装配期校验：组件名唯一、相对放置
//! 只能引用已声明的组件（前向引用视为错误）。`validate` 把
//! 放置引用当作有向依赖图做拓扑排序，显式拒绝环与悬空引用。
//!
//! ## 依赖关系
//! - 被 `commands/simulate.rs`, `commands/run.rs` 构造
//! - 使用 `instrument/component.rs`

use crate::error::{BeamflowError, Result};
use crate::instrument::component::{Component, ParamValue};

use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;

/// 仪器级输入参数
#[derive(Debug, Clone)]
pub struct InstrumentParameter {
    pub name: String,
    pub default: f64,
}

/// 仪器模型：有序组件序列 + 仪器级变量与初始化语句
#[derive(Debug, Clone, Default)]
pub struct Instrument {
    /// 仪器名
    pub name: String,
    /// 输入参数（带默认值）
    pub parameters: Vec<InstrumentParameter>,
    /// DECLARE 块中的 C 变量声明
    pub declares: Vec<String>,
    /// INITIALIZE 块中的代数初始化语句
    pub initialize: Vec<String>,
    /// 组件序列（声明顺序即光路顺序）
    pub components: Vec<Component>,
}

impl Instrument {
    pub fn new(name: impl Into<String>) -> Self {
        Instrument {
            name: name.into(),
            ..Default::default()
        }
    }

    /// 声明仪器级输入参数
    pub fn add_parameter(&mut self, name: impl Into<String>, default: f64) {
        self.parameters.push(InstrumentParameter {
            name: name.into(),
            default,
        });
    }

    /// 添加 DECLARE 变量声明（一条 C 语句）
    pub fn add_declare(&mut self, statement: impl Into<String>) {
        self.declares.push(statement.into());
    }

    /// 添加 INITIALIZE 语句（一条 C 语句）
    pub fn add_initialize(&mut self, statement: impl Into<String>) {
        self.initialize.push(statement.into());
    }

    /// 追加组件并校验名称与放置引用
    pub fn add_component(&mut self, component: Component) -> Result<()> {
        if self.components.iter().any(|c| c.name == component.name) {
            return Err(BeamflowError::DuplicateComponent(component.name));
        }

        // 相对放置/转动只允许引用已声明的组件
        for reference in component.references() {
            if !self.components.iter().any(|c| c.name == reference) {
                return Err(BeamflowError::UnknownComponentReference {
                    component: component.name.clone(),
                    reference: reference.to_string(),
                });
            }
        }

        self.components.push(component);
        Ok(())
    }

    /// 全量校验：把放置引用当作有向依赖图做拓扑排序
    ///
    /// `add_component` 已保证逐步合法；这里兜底检查整个模型
    /// （包括手工构造或修改过的组件序列），环与悬空引用都被
    /// 显式拒绝而不是留给引擎。
    pub fn validate(&self) -> Result<()> {
        let names: HashSet<&str> = self.components.iter().map(|c| c.name.as_str()).collect();

        // 悬空引用
        for component in &self.components {
            for reference in component.references() {
                if !names.contains(reference) {
                    return Err(BeamflowError::UnknownComponentReference {
                        component: component.name.clone(),
                        reference: reference.to_string(),
                    });
                }
            }
        }

        // Kahn 拓扑排序；排不完说明有环
        let mut in_degree: BTreeMap<&str, usize> = BTreeMap::new();
        let mut dependents: BTreeMap<&str, Vec<&str>> = BTreeMap::new();

        for component in &self.components {
            in_degree.entry(component.name.as_str()).or_insert(0);
            for reference in component.references() {
                if reference != component.name {
                    *in_degree.entry(component.name.as_str()).or_insert(0) += 1;
                    dependents
                        .entry(reference)
                        .or_default()
                        .push(component.name.as_str());
                }
            }
            // 自引用是长度为 1 的环
            if component.references().contains(&component.name.as_str()) {
                return Err(BeamflowError::CyclicPlacement {
                    chain: format!("{} -> {}", component.name, component.name),
                });
            }
        }

        let mut queue: Vec<&str> = in_degree
            .iter()
            .filter(|(_, deg)| **deg == 0)
            .map(|(name, _)| *name)
            .collect();
        let mut resolved = 0;

        while let Some(name) = queue.pop() {
            resolved += 1;
            if let Some(deps) = dependents.get(name) {
                for &dep in deps {
                    if let Some(deg) = in_degree.get_mut(dep) {
                        *deg -= 1;
                        if *deg == 0 {
                            queue.push(dep);
                        }
                    }
                }
            }
        }

        if resolved < self.components.len() {
            let cycle: Vec<&str> = in_degree
                .iter()
                .filter(|(_, deg)| **deg > 0)
                .map(|(name, _)| *name)
                .collect();
            return Err(BeamflowError::CyclicPlacement {
                chain: cycle.join(" -> "),
            });
        }

        Ok(())
    }

    /// 收集文件类参数（模拟前做存在性与非空检查）
    pub fn file_dependencies(&self) -> Vec<(String, PathBuf)> {
        self.components
            .iter()
            .flat_map(|component| {
                component.params.iter().filter_map(|(_, value)| match value {
                    ParamValue::File(path) => Some((component.name.clone(), path.clone())),
                    _ => None,
                })
            })
            .collect()
    }

    /// 按名查找组件
    pub fn component(&self, name: &str) -> Option<&Component> {
        self.components.iter().find(|c| c.name == name)
    }
}
