//! # 晶体结构数据模型
//!
//! 定义统一的晶体结构表示：从 CIF 解析得到，经弛豫更新原子位置，
//! 再序列化回 CIF 供反射文件转换工具使用。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `solver/`, `commands/` 使用
//! - 无外部模块依赖

use crate::error::{BeamflowError, Result};
use serde::{Deserialize, Serialize};

/// 晶格参数表示
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lattice {
    /// 晶格向量矩阵 (3x3)，行向量表示 a, b, c
    /// [[a1, a2, a3], [b1, b2, b3], [c1, c2, c3]]
    pub matrix: [[f64; 3]; 3],
}

impl Lattice {
    /// 从晶格参数 (a, b, c, alpha, beta, gamma) 创建晶格
    /// 角度单位：度
    pub fn from_parameters(a: f64, b: f64, c: f64, alpha: f64, beta: f64, gamma: f64) -> Self {
        let alpha_rad = alpha.to_radians();
        let beta_rad = beta.to_radians();
        let gamma_rad = gamma.to_radians();

        let cos_alpha = alpha_rad.cos();
        let cos_beta = beta_rad.cos();
        let cos_gamma = gamma_rad.cos();
        let sin_gamma = gamma_rad.sin();

        let a_vec = [a, 0.0, 0.0];
        let b_vec = [b * cos_gamma, b * sin_gamma, 0.0];

        let c1 = c * cos_beta;
        let c2 = c * (cos_alpha - cos_beta * cos_gamma) / sin_gamma;
        let c3 = (c * c - c1 * c1 - c2 * c2).sqrt();
        let c_vec = [c1, c2, c3];

        Lattice {
            matrix: [a_vec, b_vec, c_vec],
        }
    }

    /// 从晶格向量矩阵创建
    pub fn from_vectors(matrix: [[f64; 3]; 3]) -> Self {
        Lattice { matrix }
    }

    /// 获取晶格参数 (a, b, c, alpha, beta, gamma)
    pub fn parameters(&self) -> (f64, f64, f64, f64, f64, f64) {
        let a_vec = self.matrix[0];
        let b_vec = self.matrix[1];
        let c_vec = self.matrix[2];

        let a = (a_vec[0].powi(2) + a_vec[1].powi(2) + a_vec[2].powi(2)).sqrt();
        let b = (b_vec[0].powi(2) + b_vec[1].powi(2) + b_vec[2].powi(2)).sqrt();
        let c = (c_vec[0].powi(2) + c_vec[1].powi(2) + c_vec[2].powi(2)).sqrt();

        let dot_bc: f64 = b_vec.iter().zip(c_vec.iter()).map(|(x, y)| x * y).sum();
        let dot_ac: f64 = a_vec.iter().zip(c_vec.iter()).map(|(x, y)| x * y).sum();
        let dot_ab: f64 = a_vec.iter().zip(b_vec.iter()).map(|(x, y)| x * y).sum();

        let alpha = (dot_bc / (b * c)).acos().to_degrees();
        let beta = (dot_ac / (a * c)).acos().to_degrees();
        let gamma = (dot_ab / (a * b)).acos().to_degrees();

        (a, b, c, alpha, beta, gamma)
    }

    /// 计算晶格体积
    pub fn volume(&self) -> f64 {
        let a = self.matrix[0];
        let b = self.matrix[1];
        let c = self.matrix[2];

        // 行列式计算
        a[0] * (b[1] * c[2] - b[2] * c[1]) - a[1] * (b[0] * c[2] - b[2] * c[0])
            + a[2] * (b[0] * c[1] - b[1] * c[0])
    }

    /// 分数坐标转笛卡尔坐标 (Å)
    pub fn frac_to_cart(&self, frac: [f64; 3]) -> [f64; 3] {
        let m = self.matrix;
        [
            frac[0] * m[0][0] + frac[1] * m[1][0] + frac[2] * m[2][0],
            frac[0] * m[0][1] + frac[1] * m[1][1] + frac[2] * m[2][1],
            frac[0] * m[0][2] + frac[1] * m[1][2] + frac[2] * m[2][2],
        ]
    }
}

/// 原子信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Atom {
    /// 元素符号
    pub element: String,

    /// 分数坐标 [x, y, z]
    pub position: [f64; 3],

    /// 可选：占据率（CIF _atom_site_occupancy）
    pub occupancy: Option<f64>,

    /// 可选：各向同性温度因子 B_iso (Å²)
    pub b_iso: Option<f64>,

    /// 可选：原子标签（用于区分同种元素的不同位置）
    pub label: Option<String>,
}

impl Atom {
    pub fn new(element: impl Into<String>, position: [f64; 3]) -> Self {
        Atom {
            element: element.into(),
            position,
            occupancy: None,
            b_iso: None,
            label: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_occupancy(mut self, occupancy: f64) -> Self {
        self.occupancy = Some(occupancy);
        self
    }

    pub fn with_b_iso(mut self, b_iso: f64) -> Self {
        self.b_iso = Some(b_iso);
        self
    }
}

/// 单个原子的弛豫位移
#[derive(Debug, Clone)]
pub struct AtomDisplacement {
    /// 元素符号
    pub element: String,
    /// 分数坐标位移 [dx, dy, dz]
    pub delta_frac: [f64; 3],
    /// 笛卡尔位移模长 (Å)
    pub norm_ang: f64,
}

/// 晶体结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Crystal {
    /// 结构名称
    pub name: String,

    /// 晶格
    pub lattice: Lattice,

    /// 原子列表
    pub atoms: Vec<Atom>,

    /// 空间群
    pub space_group: Option<String>,

    /// 来源文件格式
    pub source_format: Option<String>,
}

impl Crystal {
    pub fn new(name: impl Into<String>, lattice: Lattice, atoms: Vec<Atom>) -> Self {
        Crystal {
            name: name.into(),
            lattice,
            atoms,
            space_group: None,
            source_format: None,
        }
    }

    /// 计算化学式
    pub fn formula(&self) -> String {
        use std::collections::BTreeMap;
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();

        for atom in &self.atoms {
            *counts.entry(atom.element.as_str()).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(el, count)| {
                if count == 1 {
                    el.to_string()
                } else {
                    format!("{}{}", el, count)
                }
            })
            .collect::<Vec<_>>()
            .join("")
    }

    /// 按出现顺序返回去重后的元素符号列表
    pub fn species(&self) -> Vec<String> {
        let mut species: Vec<String> = Vec::new();
        for atom in &self.atoms {
            if !species.contains(&atom.element) {
                species.push(atom.element.clone());
            }
        }
        species
    }

    /// 用新的原子位置构造弛豫后的结构副本
    ///
    /// 位置列表必须与当前原子一一对应（数量与元素顺序一致）。
    pub fn with_positions(&self, positions: &[(String, [f64; 3])]) -> Result<Crystal> {
        if positions.len() != self.atoms.len() {
            return Err(BeamflowError::AtomCountMismatch {
                before: self.atoms.len(),
                after: positions.len(),
            });
        }

        let mut relaxed = self.clone();
        for (atom, (element, position)) in relaxed.atoms.iter_mut().zip(positions.iter()) {
            if &atom.element != element {
                return Err(BeamflowError::Other(format!(
                    "Species order changed during relaxation: expected {}, got {}",
                    atom.element, element
                )));
            }
            atom.position = *position;
        }

        Ok(relaxed)
    }

    /// 计算相对于弛豫前结构的逐原子位移矩阵
    ///
    /// 原子顺序必须一致；数量不一致时返回错误而不是截断。
    pub fn displacements_from(&self, before: &Crystal) -> Result<Vec<AtomDisplacement>> {
        if self.atoms.len() != before.atoms.len() {
            return Err(BeamflowError::AtomCountMismatch {
                before: before.atoms.len(),
                after: self.atoms.len(),
            });
        }

        let displacements = self
            .atoms
            .iter()
            .zip(before.atoms.iter())
            .map(|(after, before_atom)| {
                let delta_frac = [
                    after.position[0] - before_atom.position[0],
                    after.position[1] - before_atom.position[1],
                    after.position[2] - before_atom.position[2],
                ];
                let cart = self.lattice.frac_to_cart(delta_frac);
                let norm_ang = (cart[0] * cart[0] + cart[1] * cart[1] + cart[2] * cart[2]).sqrt();

                AtomDisplacement {
                    element: after.element.clone(),
                    delta_frac,
                    norm_ang,
                }
            })
            .collect();

        Ok(displacements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lattice_from_parameters_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let (a, b, c, alpha, beta, gamma) = lattice.parameters();

        assert!((a - 5.0).abs() < 1e-6);
        assert!((b - 5.0).abs() < 1e-6);
        assert!((c - 5.0).abs() < 1e-6);
        assert!((alpha - 90.0).abs() < 1e-6);
        assert!((beta - 90.0).abs() < 1e-6);
        assert!((gamma - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_volume_cubic() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let vol = lattice.volume().abs();

        // 5^3 = 125
        assert!((vol - 125.0).abs() < 1e-6);
    }

    #[test]
    fn test_lattice_hexagonal() {
        let lattice = Lattice::from_parameters(3.0, 3.0, 5.0, 90.0, 90.0, 120.0);
        let (a, b, c, _, _, gamma) = lattice.parameters();

        assert!((a - 3.0).abs() < 0.01);
        assert!((b - 3.0).abs() < 0.01);
        assert!((c - 5.0).abs() < 0.01);
        assert!((gamma - 120.0).abs() < 0.01);
    }

    #[test]
    fn test_crystal_formula_and_species() {
        let lattice = Lattice::from_parameters(4.6, 4.6, 2.95, 90.0, 90.0, 90.0);
        let atoms = vec![
            Atom::new("Ti", [0.0, 0.0, 0.0]),
            Atom::new("Ti", [0.5, 0.5, 0.5]),
            Atom::new("O", [0.3, 0.3, 0.0]),
            Atom::new("O", [0.7, 0.7, 0.0]),
            Atom::new("O", [0.2, 0.8, 0.5]),
            Atom::new("O", [0.8, 0.2, 0.5]),
        ];
        let crystal = Crystal::new("TiO2", lattice, atoms);

        assert_eq!(crystal.formula(), "O4Ti2");
        assert_eq!(crystal.species(), vec!["Ti".to_string(), "O".to_string()]);
    }

    #[test]
    fn test_with_positions_updates_coordinates() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let atoms = vec![
            Atom::new("Na", [0.0, 0.0, 0.0]),
            Atom::new("Cl", [0.5, 0.5, 0.5]),
        ];
        let crystal = Crystal::new("NaCl", lattice, atoms);

        let relaxed = crystal
            .with_positions(&[
                ("Na".to_string(), [0.01, 0.0, 0.0]),
                ("Cl".to_string(), [0.5, 0.49, 0.5]),
            ])
            .unwrap();

        assert!((relaxed.atoms[0].position[0] - 0.01).abs() < 1e-12);
        assert!((relaxed.atoms[1].position[1] - 0.49).abs() < 1e-12);
    }

    #[test]
    fn test_with_positions_rejects_count_mismatch() {
        let lattice = Lattice::from_parameters(5.0, 5.0, 5.0, 90.0, 90.0, 90.0);
        let crystal = Crystal::new("Na", lattice, vec![Atom::new("Na", [0.0, 0.0, 0.0])]);

        let result = crystal.with_positions(&[
            ("Na".to_string(), [0.0, 0.0, 0.0]),
            ("Na".to_string(), [0.5, 0.5, 0.5]),
        ]);

        assert!(matches!(
            result,
            Err(crate::error::BeamflowError::AtomCountMismatch { .. })
        ));
    }

    #[test]
    fn test_displacements_from() {
        let lattice = Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 90.0);
        let before = Crystal::new(
            "Fe",
            lattice.clone(),
            vec![Atom::new("Fe", [0.0, 0.0, 0.0])],
        );
        let after = Crystal::new("Fe", lattice, vec![Atom::new("Fe", [0.1, 0.0, 0.0])]);

        let disp = after.displacements_from(&before).unwrap();
        assert_eq!(disp.len(), 1);
        assert!((disp[0].delta_frac[0] - 0.1).abs() < 1e-12);
        // 0.1 * 10 Å = 1 Å
        assert!((disp[0].norm_ang - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_displacements_mismatch_is_error() {
        let lattice = Lattice::from_parameters(10.0, 10.0, 10.0, 90.0, 90.0, 90.0);
        let before = Crystal::new(
            "Fe2",
            lattice.clone(),
            vec![
                Atom::new("Fe", [0.0, 0.0, 0.0]),
                Atom::new("Fe", [0.5, 0.5, 0.5]),
            ],
        );
        let after = Crystal::new("Fe", lattice, vec![Atom::new("Fe", [0.0, 0.0, 0.0])]);

        assert!(after.displacements_from(&before).is_err());
    }

    #[test]
    fn test_atom_metadata_builders() {
        let atom = Atom::new("Si", [0.25, 0.25, 0.25])
            .with_label("Si1")
            .with_occupancy(1.0)
            .with_b_iso(0.5);

        assert_eq!(atom.label, Some("Si1".to_string()));
        assert_eq!(atom.occupancy, Some(1.0));
        assert_eq!(atom.b_iso, Some(0.5));
    }
}
