//! # 求解器输入文件生成
//!
//! 把晶体结构与作业配置序列化成 pw.x 风格的输入文件
//! （namelist + 结构卡片），与生成 sbatch 脚本的方式一致：
//! 纯文本模板，所有值显式写入。
//!
//! ## 依赖关系
//! - 被 `solver/runner.rs` 使用
//! - 使用 `models/structure.rs`, `solver/config.rs`

use crate::error::{BeamflowError, Result};
use crate::models::Crystal;
use crate::solver::config::SolverConfig;

/// 常见元素的标准原子量；输入文件的 ATOMIC_SPECIES 卡片需要
const ATOMIC_MASSES: &[(&str, f64)] = &[
    ("H", 1.008),
    ("He", 4.0026),
    ("Li", 6.94),
    ("Be", 9.0122),
    ("B", 10.81),
    ("C", 12.011),
    ("N", 14.007),
    ("O", 15.999),
    ("F", 18.998),
    ("Ne", 20.180),
    ("Na", 22.990),
    ("Mg", 24.305),
    ("Al", 26.982),
    ("Si", 28.085),
    ("P", 30.974),
    ("S", 32.06),
    ("Cl", 35.45),
    ("Ar", 39.948),
    ("K", 39.098),
    ("Ca", 40.078),
    ("Ti", 47.867),
    ("V", 50.942),
    ("Cr", 51.996),
    ("Mn", 54.938),
    ("Fe", 55.845),
    ("Co", 58.933),
    ("Ni", 58.693),
    ("Cu", 63.546),
    ("Zn", 65.38),
    ("Ga", 69.723),
    ("Ge", 72.630),
    ("As", 74.922),
    ("Se", 78.971),
    ("Br", 79.904),
    ("Sr", 87.62),
    ("Zr", 91.224),
    ("Nb", 92.906),
    ("Mo", 95.95),
    ("Ag", 107.87),
    ("Cd", 112.41),
    ("Sn", 118.71),
    ("Sb", 121.76),
    ("I", 126.90),
    ("Ba", 137.33),
    ("W", 183.84),
    ("Pt", 195.08),
    ("Au", 196.97),
    ("Pb", 207.2),
    ("Bi", 208.98),
];

/// 查表取原子量
fn atomic_mass(element: &str) -> Option<f64> {
    ATOMIC_MASSES
        .iter()
        .find(|(symbol, _)| *symbol == element)
        .map(|(_, mass)| *mass)
}

/// 生成完整的弛豫输入文件内容
pub fn render_input(crystal: &Crystal, config: &SolverConfig) -> Result<String> {
    let species = crystal.species();

    // 每个元素必须有赝势映射；缺失在这里报错而不是等求解器失败
    for element in &species {
        if !config.pseudopotentials.contains_key(element) {
            return Err(BeamflowError::MissingPseudopotential {
                element: element.clone(),
                path: format!("(no mapping; expected under {})", config.pseudo_dir.display()),
            });
        }
    }

    let mut deck = String::new();

    deck.push_str("&CONTROL\n");
    deck.push_str("  calculation = 'relax'\n");
    deck.push_str(&format!("  prefix = '{}'\n", config.prefix));
    deck.push_str(&format!("  pseudo_dir = '{}'\n", config.pseudo_dir.display()));
    deck.push_str(&format!("  outdir = '{}'\n", config.outdir.display()));
    deck.push_str("  tstress = .true.\n");
    deck.push_str("  tprnfor = .true.\n");
    deck.push_str(&format!("  forc_conv_thr = {:e}\n", config.forc_conv_thr));
    deck.push_str(&format!("  etot_conv_thr = {:e}\n", config.etot_conv_thr));
    deck.push_str("/\n");

    deck.push_str("&SYSTEM\n");
    deck.push_str("  ibrav = 0\n");
    deck.push_str(&format!("  nat = {}\n", crystal.atoms.len()));
    deck.push_str(&format!("  ntyp = {}\n", species.len()));
    deck.push_str(&format!("  ecutwfc = {}\n", config.ecutwfc));
    deck.push_str(&format!("  ecutrho = {}\n", config.ecutrho));
    deck.push_str("  occupations = 'smearing'\n");
    deck.push_str(&format!("  smearing = '{}'\n", config.smearing.keyword()));
    deck.push_str(&format!("  degauss = {}\n", config.degauss));
    deck.push_str("/\n");

    deck.push_str("&ELECTRONS\n");
    deck.push_str(&format!("  conv_thr = {:e}\n", config.conv_thr));
    deck.push_str(&format!("  mixing_beta = {}\n", config.mixing_beta));
    deck.push_str(&format!("  electron_maxstep = {}\n", config.electron_maxstep));
    deck.push_str("/\n");

    deck.push_str("&IONS\n");
    deck.push_str(&format!(
        "  ion_dynamics = '{}'\n",
        config.ion_dynamics.keyword()
    ));
    deck.push_str("/\n");

    deck.push_str("CELL_PARAMETERS angstrom\n");
    for row in &crystal.lattice.matrix {
        deck.push_str(&format!(
            "  {:16.10}  {:16.10}  {:16.10}\n",
            row[0], row[1], row[2]
        ));
    }

    deck.push_str("ATOMIC_SPECIES\n");
    for element in &species {
        let mass = atomic_mass(element).unwrap_or(1.0);
        // 上面已检查过映射存在
        let pseudo = &config.pseudopotentials[element];
        deck.push_str(&format!("  {:4} {:10.4} {}\n", element, mass, pseudo));
    }

    deck.push_str("ATOMIC_POSITIONS crystal\n");
    for atom in &crystal.atoms {
        deck.push_str(&format!(
            "  {:4} {:16.10} {:16.10} {:16.10}\n",
            atom.element, atom.position[0], atom.position[1], atom.position[2]
        ));
    }

    deck.push_str("K_POINTS automatic\n");
    deck.push_str(&format!(
        "  {} {} {} {} {} {}\n",
        config.kpoints[0],
        config.kpoints[1],
        config.kpoints[2],
        config.kpoint_offset[0],
        config.kpoint_offset[1],
        config.kpoint_offset[2],
    ));

    Ok(deck)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Atom, Lattice};

    fn silicon() -> Crystal {
        let lattice = Lattice::from_parameters(5.43, 5.43, 5.43, 90.0, 90.0, 90.0);
        Crystal::new(
            "Si",
            lattice,
            vec![
                Atom::new("Si", [0.0, 0.0, 0.0]),
                Atom::new("Si", [0.25, 0.25, 0.25]),
            ],
        )
    }

    fn config_with_pseudo() -> SolverConfig {
        let mut config = SolverConfig::default();
        config
            .pseudopotentials
            .insert("Si".to_string(), "Si.pbe-n-rrkjus_psl.1.0.0.UPF".to_string());
        config
    }

    #[test]
    fn test_render_contains_physics_cards() {
        let deck = render_input(&silicon(), &config_with_pseudo()).unwrap();

        assert!(deck.contains("calculation = 'relax'"));
        assert!(deck.contains("nat = 2"));
        assert!(deck.contains("ntyp = 1"));
        assert!(deck.contains("ecutwfc = 50"));
        assert!(deck.contains("ecutrho = 400"));
        assert!(deck.contains("smearing = 'mv'"));
        assert!(deck.contains("ion_dynamics = 'bfgs'"));
        assert!(deck.contains("K_POINTS automatic"));
        assert!(deck.contains("  4 4 4 0 0 0"));
        assert!(deck.contains("Si.pbe-n-rrkjus_psl.1.0.0.UPF"));
    }

    #[test]
    fn test_render_positions_in_order() {
        let deck = render_input(&silicon(), &config_with_pseudo()).unwrap();

        let positions_card = deck.split("ATOMIC_POSITIONS crystal").nth(1).unwrap();
        let first_atom_line = positions_card.lines().nth(1).unwrap();
        assert!(first_atom_line.trim_start().starts_with("Si"));
        assert!(first_atom_line.contains("0.0000000000"));
    }

    #[test]
    fn test_render_missing_pseudo_is_error() {
        let config = SolverConfig::default(); // 空映射
        let result = render_input(&silicon(), &config);

        assert!(matches!(
            result,
            Err(BeamflowError::MissingPseudopotential { .. })
        ));
    }

    #[test]
    fn test_atomic_mass_lookup() {
        assert!((atomic_mass("Si").unwrap() - 28.085).abs() < 1e-9);
        assert!(atomic_mass("Xx").is_none());
    }
}
