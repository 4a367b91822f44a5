/*
 * Responsibility
 * - middleware の公開インターフェース
 * - cors / amp / http / security_headers は Router 全体に、auth は保護ルートにだけ掛ける
 */
pub mod amp;
pub mod auth;
pub mod cors;
pub mod http;
pub mod security_headers;
