//! 蔵書目録マネージャ
//!
//! 書籍と会員の2つのインメモリレジストリを単一の目録サービスで束ね、
//! レジストリ横断の不変条件（ISBN重複なし、二重貸出なし、貸出上限）を
//! 強制する。永続化はデータディレクトリ配下のCSVファイルへの
//! アダプタが担う。対話シェルなどの外部コラボレータは本クレートの
//! 公開APIだけを消費する。

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
