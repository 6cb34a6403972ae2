pub mod subscription_enforcement;
